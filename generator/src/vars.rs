//! Shapes raw `<member>` / `<param>` declarations into the wrapped form the
//! emitter prints: type prefix/suffix reassembly, array and string views,
//! struct references, pointer lifting, and the object type/handle pairing.

use registry::catalog::Catalog;
use registry::doc::{Element, Node, StrId};

/// The pieces of a C declaration, reassembled from the element's
/// interleaved text and child elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarInfo {
    pub type_prefix: &'static str,
    pub ty: &'static str,
    pub type_suffix: &'static str,
    pub name: &'static str,
    /// A fixed bound: either a bracketed literal or an `<enum>` constant.
    pub array: &'static str,
    pub comment: &'static str,
}

/// Reads the ordered children of a `<member>` or `<param>` element. Text
/// nodes fill the type prefix, the type suffix, and a trailing `[N]` bound,
/// depending on which child elements came before them.
pub fn var_info(cat: &Catalog, elem: &Element) -> VarInfo {
    let doc = cat.doc;
    let tags = &cat.tags;
    let mut info = VarInfo::default();
    let mut slot = 0u8;
    for node in doc.children(elem) {
        match node {
            Node::Text(id) => {
                let text = doc.str(id);
                match slot {
                    0 => info.type_prefix = text,
                    1 => info.type_suffix = text.trim_end_matches(' '),
                    2 => {
                        if let Some(bound) =
                            text.strip_prefix('[').and_then(|t| t.strip_suffix(']'))
                        {
                            info.array = bound;
                        }
                    }
                    _ => {}
                }
                slot = 3;
            }
            Node::Element(id) => {
                let child = doc.element(id);
                let text = doc.text(&child).map_or("", |t| doc.str(t));
                if child.tag == tags.type_ {
                    slot = 1;
                    info.ty = text;
                } else if child.tag == tags.name {
                    slot = 2;
                    info.name = text;
                } else if child.tag == tags.enum_ {
                    slot = 3;
                    info.array = text;
                } else if child.tag == tags.comment {
                    slot = 3;
                    info.comment = text;
                }
            }
        }
    }
    info
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberTag {
    Normal,
    /// One leg of a composite; emitted only through its master.
    Slave,
    /// The composite itself, preceded by this many slave slots.
    Master(u8),
}

#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub var: VarInfo,
    /// The wrapped type spelled in the emitted getter/setter.
    pub new_type: String,
    /// Field selector appended when writing a composite slot (".type").
    pub slave_name: &'static str,
    pub values_attr: Option<StrId>,
    pub optional: bool,
    pub add_cast: bool,
    pub is_ptr: bool,
    pub is_arr: bool,
    pub is_str: bool,
    pub is_struct: bool,
    pub tag: MemberTag,
}

pub fn member_info(cat: &Catalog, elem: &Element) -> MemberInfo {
    let doc = cat.doc;
    let mut var = var_info(cat, elem);
    let optional = doc.find_attr(elem, cat.tags.optional).is_some();
    let values_attr = doc.find_attr(elem, cat.tags.values);
    let mut add_cast = false;
    if let Some(stripped) = var.ty.strip_prefix("Vk") {
        var.ty = stripped;
        add_cast = !cat.is_raw(stripped);
    }
    let is_ptr = var.type_suffix.ends_with('*');
    let is_arr = !var.array.is_empty();
    let mut info = MemberInfo {
        var,
        new_type: String::new(),
        slave_name: "",
        values_attr,
        optional,
        add_cast,
        is_ptr,
        is_arr,
        is_str: false,
        is_struct: false,
        tag: MemberTag::Normal,
    };
    if is_arr && info.var.ty == "char" {
        info.is_str = true;
        info.new_type.push_str("std::string_view");
    } else {
        if is_arr {
            info.new_type.push_str("std::span<const ");
        } else {
            info.is_struct = info.var.type_prefix.is_empty()
                && info.var.type_suffix.is_empty()
                && cat.is_struct(info.var.ty);
        }
        if info.is_struct {
            info.new_type.push_str("const ");
            info.new_type.push_str(info.var.ty);
            info.new_type.push('&');
        } else {
            info.new_type.push_str(info.var.type_prefix);
            info.new_type.push_str(info.var.ty);
            info.new_type.push_str(info.var.type_suffix);
        }
        if is_arr {
            info.new_type.push_str(", ");
            info.new_type.push_str(info.var.array);
            info.new_type.push('>');
        }
    }
    info
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: String,
    /// The underlying `Vk` type to bit-cast through, empty when none.
    pub cast: String,
    pub add_ptr: bool,
    pub is_arr: bool,
    pub optional: bool,
    pub tag: MemberTag,
}

/// Shapes a command parameter. The second result is the candidate output
/// type (the raw registry spelling) when this parameter is a bare pointer
/// that could be lifted to the return side.
pub fn param_info(cat: &Catalog, elem: &Element) -> (ParamInfo, Option<&'static str>) {
    let doc = cat.doc;
    let optional_attr = doc.find_attr(elem, cat.tags.optional);
    let mut var = var_info(cat, elem);
    let full_ty = var.ty;
    let is_ptr = var.type_suffix.ends_with('*');
    let mut add_cast = false;
    if let Some(stripped) = var.ty.strip_prefix("Vk") {
        var.ty = stripped;
        add_cast = !cat.is_raw(stripped);
    }
    let mut info = ParamInfo {
        name: var.name.to_owned(),
        ty: String::new(),
        cast: String::new(),
        add_ptr: false,
        is_arr: !var.array.is_empty(),
        optional: matches!(optional_attr, Some(attr) if doc.str(attr) == "true"),
        tag: MemberTag::Normal,
    };
    if info.is_arr {
        info.ty.push_str("std::span<");
    }
    info.ty.push_str(var.type_prefix);
    info.ty.push_str(var.ty);
    let mut out_type = None;
    if is_ptr && doc.find_attr(elem, cat.tags.len).is_none() {
        if optional_attr.is_none() && var.type_prefix.starts_with("const") && full_ty != "void" {
            // A lone `const T*` input becomes a reference parameter.
            rename_ptr_name(&mut info.name);
            info.add_ptr = true;
            info.ty.push('&');
            var.type_suffix = "";
        }
        if !info.optional && !info.is_arr {
            out_type = Some(full_ty);
        }
    }
    info.ty.push_str(var.type_suffix);
    if info.is_arr {
        info.ty.push_str(", ");
        info.ty.push_str(var.array);
        info.ty.push('>');
    }
    if add_cast {
        info.cast.push_str(var.type_prefix);
        info.cast.push_str(full_ty);
        info.cast.push_str(var.type_suffix);
        if info.add_ptr || info.is_arr {
            info.cast.push('*');
        }
    }
    (info, out_type)
}

fn rename_ptr_name(name: &mut String) {
    if let Some(rest) = name.strip_prefix('p') {
        *name = rest.to_owned();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_lowercase();
        }
    }
}

/// Whether any name in the comma-separated `len` list refers to an optional
/// entry already shaped.
pub fn any_optional_member(members: &[MemberInfo], len: &str) -> bool {
    len.split(',')
        .any(|item| members.iter().any(|m| m.var.name == item && m.optional))
}

pub fn any_optional_param(params: &[ParamInfo], len: &str) -> bool {
    len.split(',')
        .any(|item| params.iter().any(|p| p.name == item && p.optional))
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::encode::{elem, encode, ElemDesc};
    use registry::doc::Document;

    fn catalog_for(types: ElemDesc, member: &ElemDesc) -> (Catalog, Element) {
        let root = elem("registry")
            .child(types)
            .child(elem("holder").child(member.clone()));
        let doc = Document::new(Box::leak(encode(&root).into_boxed_slice()));
        let mut cat = Catalog::new(doc);
        cat.process();
        let root = cat.doc.root();
        let holder = cat.doc.intern("holder").unwrap();
        let (_, holder) = cat.doc.tagged_children(&root, holder).next().unwrap();
        let member_tag = cat.doc.intern("member").unwrap();
        let (_, member) = cat.doc.tagged_children(&holder, member_tag).next().unwrap();
        (cat, member)
    }

    fn plain_types() -> ElemDesc {
        elem("types").child(
            elem("type")
                .attr("category", "basetype")
                .child(elem("name").text("VkBool32")),
        )
    }

    #[test]
    fn reconstructs_prefix_type_suffix_and_name() {
        let member = elem("member")
            .text("const ")
            .child(elem("type").text("VkBool32"))
            .text("* ")
            .child(elem("name").text("pFlag"));
        let (cat, member) = catalog_for(plain_types(), &member);
        let var = var_info(&cat, &member);
        assert_eq!(var.type_prefix, "const ");
        assert_eq!(var.ty, "VkBool32");
        assert_eq!(var.type_suffix, "*");
        assert_eq!(var.name, "pFlag");
        assert_eq!(var.array, "");
    }

    #[test]
    fn bracketed_and_enum_array_bounds() {
        let bracketed = elem("member")
            .child(elem("type").text("float"))
            .text(" ")
            .child(elem("name").text("color"))
            .text("[4]");
        let (cat, member) = catalog_for(plain_types(), &bracketed);
        assert_eq!(var_info(&cat, &member).array, "4");

        let named = elem("member")
            .child(elem("type").text("char"))
            .text(" ")
            .child(elem("name").text("deviceName"))
            .text("[")
            .child(elem("enum").text("VK_MAX_NAME_SIZE"))
            .text("]");
        let (cat, member) = catalog_for(plain_types(), &named);
        assert_eq!(var_info(&cat, &member).array, "VK_MAX_NAME_SIZE");
    }

    #[test]
    fn char_arrays_become_string_views() {
        let member = elem("member")
            .child(elem("type").text("char"))
            .text(" ")
            .child(elem("name").text("deviceName"))
            .text("[")
            .child(elem("enum").text("VK_MAX_NAME_SIZE"))
            .text("]");
        let (cat, member) = catalog_for(plain_types(), &member);
        let info = member_info(&cat, &member);
        assert!(info.is_str);
        assert_eq!(info.new_type, "std::string_view");
    }

    #[test]
    fn fixed_arrays_become_bounded_spans() {
        let member = elem("member")
            .child(elem("type").text("float"))
            .text(" ")
            .child(elem("name").text("color"))
            .text("[4]");
        let (cat, member) = catalog_for(plain_types(), &member);
        let info = member_info(&cat, &member);
        assert_eq!(info.new_type, "std::span<const float, 4>");
        assert!(!info.add_cast);
    }

    #[test]
    fn registry_types_are_unwrapped_with_a_cast() {
        let member = elem("member")
            .child(elem("type").text("VkFormat"))
            .text(" ")
            .child(elem("name").text("format"));
        let (cat, member) = catalog_for(plain_types(), &member);
        let info = member_info(&cat, &member);
        assert_eq!(info.var.ty, "Format");
        assert_eq!(info.new_type, "Format");
        assert!(info.add_cast);
    }

    #[test]
    fn raw_types_are_unwrapped_without_a_cast() {
        let member = elem("member")
            .child(elem("type").text("VkBool32"))
            .text(" ")
            .child(elem("name").text("enabled"));
        let (cat, member) = catalog_for(plain_types(), &member);
        let info = member_info(&cat, &member);
        assert_eq!(info.var.ty, "Bool32");
        assert!(!info.add_cast);
    }

    #[test]
    fn plain_struct_members_are_taken_by_reference() {
        let types = elem("types").child(
            elem("type")
                .attr("category", "struct")
                .attr("name", "VkExtent2D")
                .child(
                    elem("member")
                        .child(elem("type").text("uint32_t"))
                        .text(" ")
                        .child(elem("name").text("width")),
                ),
        );
        let member = elem("member")
            .child(elem("type").text("VkExtent2D"))
            .text(" ")
            .child(elem("name").text("extent"));
        let (cat, member) = catalog_for(types, &member);
        let info = member_info(&cat, &member);
        assert!(info.is_struct);
        assert_eq!(info.new_type, "const Extent2D&");
    }

    fn param_of(desc: ElemDesc) -> (ParamInfo, Option<&'static str>) {
        let member = desc;
        let root = elem("registry").child(elem("holder").child(member));
        let doc = Document::new(Box::leak(encode(&root).into_boxed_slice()));
        let mut cat = Catalog::new(doc);
        cat.process();
        let root = cat.doc.root();
        let holder = cat.doc.intern("holder").unwrap();
        let (_, holder) = cat.doc.tagged_children(&root, holder).next().unwrap();
        let param_tag = cat.doc.intern("param").unwrap();
        let (_, param) = cat.doc.tagged_children(&holder, param_tag).next().unwrap();
        param_info(&cat, &param)
    }

    #[test]
    fn const_pointer_inputs_become_references() {
        let (info, out) = param_of(
            elem("param")
                .text("const ")
                .child(elem("type").text("VkRect2D"))
                .text("* ")
                .child(elem("name").text("pScissor")),
        );
        assert_eq!(info.name, "scissor");
        assert_eq!(info.ty, "const Rect2D&");
        assert!(info.add_ptr);
        assert_eq!(info.cast, "const VkRect2D*");
        // A required bare pointer is also an output candidate.
        assert_eq!(out, Some("VkRect2D"));
    }

    #[test]
    fn optional_pointers_keep_pointer_shape() {
        let (info, out) = param_of(
            elem("param")
                .attr("optional", "true")
                .text("const ")
                .child(elem("type").text("VkRect2D"))
                .text("* ")
                .child(elem("name").text("pScissor")),
        );
        assert_eq!(info.name, "pScissor");
        assert_eq!(info.ty, "const Rect2D*");
        assert!(info.optional);
        assert!(!info.add_ptr);
        assert_eq!(out, None);
    }

    #[test]
    fn len_pointers_are_not_lifted() {
        let (info, out) = param_of(
            elem("param")
                .attr("len", "count")
                .text("const ")
                .child(elem("type").text("uint32_t"))
                .text("* ")
                .child(elem("name").text("pValues")),
        );
        assert_eq!(info.ty, "const uint32_t*");
        assert_eq!(info.name, "pValues");
        assert_eq!(out, None);
    }

    #[test]
    fn optional_len_references_propagate() {
        let params = vec![
            ParamInfo {
                name: "count".to_owned(),
                ty: "uint32_t".to_owned(),
                cast: String::new(),
                add_ptr: false,
                is_arr: false,
                optional: true,
                tag: MemberTag::Normal,
            },
        ];
        assert!(any_optional_param(&params, "count"));
        assert!(any_optional_param(&params, "other,count"));
        assert!(!any_optional_param(&params, "other"));
    }
}
