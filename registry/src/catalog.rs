//! Walks the registry document and builds the typed catalog: every type
//! declaration classified by kind, the support map from enabling features
//! and extensions, struct/enum extension records, command-to-handle routing,
//! and the dependency edges the topological sorter consumes.

use crate::deps::DepSet;
use crate::doc::{Document, ElemId, Element, Node, StrId};
use crate::sort::topological_sort;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Raw,
    Enum,
    Bitmask,
    Alias,
    Struct,
    Handle,
}

/// A declared type: its kind plus an index into that kind's table.
/// `Raw`, `Enum`, `Struct`, and `Handle` share [`Catalog::type_infos`];
/// aliases and bitmasks have their own tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeId {
    pub kind: TypeKind,
    pub index: u32,
}

#[derive(Debug)]
pub struct TypeInfo {
    pub name: &'static str,
    /// Absent for raw types, which are emitted from the name alone.
    pub elem: Option<ElemId>,
}

#[derive(Debug)]
pub struct AliasInfo {
    pub name: &'static str,
    pub target: &'static str,
}

#[derive(Debug)]
pub struct BitmaskInfo {
    pub name: &'static str,
    pub ty: &'static str,
    pub enum_ty: Option<&'static str>,
}

/// An `<enum extends=…>` injection plus the scope that introduced it.
#[derive(Debug, Clone, Copy)]
pub struct EnumExtend {
    pub elem: ElemId,
    pub guard: StrId,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: StrId,
    pub elem: ElemId,
}

#[derive(Debug, Clone, Copy)]
struct CommandTarget {
    first_param_ty: Option<StrId>,
    elem: ElemId,
}

/// Interned ids of the registry's well-known element tags and attribute
/// names. An id of [`StrId::NONE`] means the document never uses the name,
/// which makes every comparison against it fail, as intended.
#[derive(Debug)]
pub struct TagIds {
    pub tags: StrId,
    pub tag: StrId,
    pub enums: StrId,
    pub enum_: StrId,
    pub types: StrId,
    pub type_: StrId,
    pub category: StrId,
    pub name: StrId,
    pub alias: StrId,
    pub member: StrId,
    pub comment: StrId,
    pub bitvalues: StrId,
    pub requires: StrId,
    pub require: StrId,
    pub deprecated: StrId,
    pub deprecatedby: StrId,
    pub bitwidth: StrId,
    pub returnedonly: StrId,
    pub extensions: StrId,
    pub extension: StrId,
    pub extends: StrId,
    pub feature: StrId,
    pub structextends: StrId,
    pub depends: StrId,
    pub values: StrId,
    pub optional: StrId,
    pub commands: StrId,
    pub command: StrId,
    pub proto: StrId,
    pub param: StrId,
    pub len: StrId,
    pub api: StrId,
    pub apitype: StrId,
    pub supported: StrId,
    pub remove: StrId,
    pub objtypeenum: StrId,
    pub provisional: StrId,
}

impl TagIds {
    fn new(doc: &Document) -> TagIds {
        let t = |s: &str| doc.intern(s).unwrap_or_default();
        TagIds {
            tags: t("tags"),
            tag: t("tag"),
            enums: t("enums"),
            enum_: t("enum"),
            types: t("types"),
            type_: t("type"),
            category: t("category"),
            name: t("name"),
            alias: t("alias"),
            member: t("member"),
            comment: t("comment"),
            bitvalues: t("bitvalues"),
            requires: t("requires"),
            require: t("require"),
            deprecated: t("deprecated"),
            deprecatedby: t("deprecatedby"),
            bitwidth: t("bitwidth"),
            returnedonly: t("returnedonly"),
            extensions: t("extensions"),
            extension: t("extension"),
            extends: t("extends"),
            feature: t("feature"),
            structextends: t("structextends"),
            depends: t("depends"),
            values: t("values"),
            optional: t("optional"),
            commands: t("commands"),
            command: t("command"),
            proto: t("proto"),
            param: t("param"),
            len: t("len"),
            api: t("api"),
            apitype: t("apitype"),
            supported: t("supported"),
            remove: t("remove"),
            objtypeenum: t("objtypeenum"),
            provisional: t("provisional"),
        }
    }
}

pub struct Catalog {
    pub doc: Document,
    pub tags: TagIds,
    /// Declaration order, rewritten in place by [`Catalog::sort_types`].
    pub type_ids: Vec<TypeId>,
    pub type_infos: Vec<TypeInfo>,
    pub alias_infos: Vec<AliasInfo>,
    pub bitmask_infos: Vec<BitmaskInfo>,
    pub deps: DepSet,
    pub global_commands: Vec<CommandInfo>,
    vendor_tags: HashSet<&'static str>,
    raws: HashSet<&'static str>,
    structs: HashSet<&'static str>,
    enum_or_flag: HashSet<&'static str>,
    scopes: HashSet<&'static str>,
    supported: HashMap<&'static str, StrId>,
    handle_commands: IndexMap<&'static str, Vec<CommandInfo>>,
    struct_extends: IndexMap<&'static str, Vec<ElemId>>,
    enum_extends: IndexMap<&'static str, Vec<EnumExtend>>,
    command_elems: HashMap<&'static str, CommandTarget>,
    internal_features: HashMap<&'static str, ElemId>,
}

impl Catalog {
    pub fn new(doc: Document) -> Catalog {
        let tags = TagIds::new(&doc);
        Catalog {
            doc,
            tags,
            type_ids: Vec::new(),
            type_infos: Vec::new(),
            alias_infos: Vec::new(),
            bitmask_infos: Vec::new(),
            deps: DepSet::default(),
            global_commands: Vec::new(),
            vendor_tags: HashSet::new(),
            raws: HashSet::new(),
            structs: HashSet::new(),
            enum_or_flag: HashSet::new(),
            scopes: HashSet::new(),
            supported: HashMap::new(),
            handle_commands: IndexMap::new(),
            struct_extends: IndexMap::new(),
            enum_extends: IndexMap::new(),
            command_elems: HashMap::new(),
            internal_features: HashMap::new(),
        }
    }

    /// Processes the root element's children in document order.
    pub fn process(&mut self) {
        let doc = self.doc;
        let root = doc.root();
        for node in doc.children(&root) {
            let Node::Element(id) = node else { continue };
            let elem = doc.element(id);
            if elem.tag == self.tags.types {
                for (type_id, type_elem) in doc.tagged_children(&elem, self.tags.type_) {
                    self.process_type(type_id, &type_elem);
                }
            } else if elem.tag == self.tags.enums {
                let name = doc.find_attr(&elem, self.tags.name).map_or("", |v| doc.str(v));
                if let Some(name) = name.strip_prefix("Vk") {
                    self.push_type(TypeKind::Enum, name, Some(id));
                }
            } else if elem.tag == self.tags.tags {
                for (_, tag_elem) in doc.tagged_children(&elem, self.tags.tag) {
                    if let Some(name) = doc.find_attr(&tag_elem, self.tags.name) {
                        self.vendor_tags.insert(doc.str(name));
                    }
                }
            } else if elem.tag == self.tags.feature {
                if !self.check_api(&elem) {
                    continue;
                }
                let guard = doc.find_attr(&elem, self.tags.name).unwrap_or_default();
                if let Some(apitype) = doc.find_attr(&elem, self.tags.apitype) {
                    if doc.str(apitype) == "internal" {
                        // Held back until another feature depends on it.
                        self.internal_features.insert(doc.str(guard), id);
                        continue;
                    }
                }
                self.process_feature(id, guard);
            } else if elem.tag == self.tags.extensions {
                for (_, ext) in doc.tagged_children(&elem, self.tags.extension) {
                    self.process_extension(&ext);
                }
            } else if elem.tag == self.tags.commands {
                for (cmd_id, cmd) in doc.tagged_children(&elem, self.tags.command) {
                    self.process_command(cmd_id, &cmd);
                }
            }
        }
        debug!(
            types = self.type_ids.len(),
            edges = self.deps.len(),
            supported = self.supported.len(),
            global_commands = self.global_commands.len(),
            "catalog built"
        );
    }

    /// Reorders [`Catalog::type_ids`] so dependencies come first. Returns
    /// the length of the sorted prefix; the tail, if any, is cyclic.
    pub fn sort_types(&mut self) -> usize {
        let mut ids = std::mem::take(&mut self.type_ids);
        let sorted = topological_sort(&mut ids, |from, to| {
            self.deps.contains(self.type_name(from), self.type_name(to))
        });
        self.type_ids = ids;
        sorted
    }

    pub fn type_name(&self, id: TypeId) -> &'static str {
        let index = id.index as usize;
        match id.kind {
            TypeKind::Alias => self.alias_infos[index].name,
            TypeKind::Bitmask => self.bitmask_infos[index].name,
            _ => self.type_infos[index].name,
        }
    }

    /// The guard of the first scope that enabled `name`, if any.
    pub fn find_support(&self, name: &str) -> Option<StrId> {
        self.supported.get(name).copied()
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.supported.contains_key(name)
    }

    pub fn is_raw(&self, name: &str) -> bool {
        self.raws.contains(name)
    }

    pub fn is_struct(&self, name: &str) -> bool {
        self.structs.contains(name)
    }

    pub fn is_enum_or_flag(&self, name: &str) -> bool {
        self.enum_or_flag.contains(name)
    }

    pub fn is_handle(&self, name: &str) -> bool {
        self.handle_commands.contains_key(name)
    }

    pub fn commands_of(&self, handle: &str) -> &[CommandInfo] {
        self.handle_commands.get(handle).map_or(&[], Vec::as_slice)
    }

    pub fn struct_extends_of(&self, name: &str) -> &[ElemId] {
        self.struct_extends.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn is_struct_extended(&self, name: &str) -> bool {
        self.struct_extends.contains_key(name)
    }

    pub fn enum_extends_of(&self, name: &str) -> &[EnumExtend] {
        self.enum_extends.get(name).map_or(&[], Vec::as_slice)
    }

    /// The substring after the final `_`, when it is a known vendor tag.
    pub fn vendor_suffix<'s>(&self, name: &'s str) -> Option<&'s str> {
        let (_, suffix) = name.rsplit_once('_')?;
        self.vendor_tags.contains(suffix).then_some(suffix)
    }

    /// Whether the element applies to the `vulkan` API and is not
    /// deprecated.
    pub fn check_api(&self, elem: &Element) -> bool {
        if let Some(api) = self.doc.find_attr(elem, self.tags.api) {
            if !self.doc.str(api).split(',').any(|item| item == "vulkan") {
                return false;
            }
        }
        self.doc.find_attr(elem, self.tags.deprecated).is_none()
    }

    fn push_type(&mut self, kind: TypeKind, name: &'static str, elem: Option<ElemId>) {
        self.type_ids.push(TypeId {
            kind,
            index: self.type_infos.len() as u32,
        });
        self.type_infos.push(TypeInfo { name, elem });
    }

    fn add_raw(&mut self, name: &'static str) {
        self.push_type(TypeKind::Raw, name, None);
        self.raws.insert(name);
    }

    fn process_type(&mut self, id: ElemId, elem: &Element) {
        let doc = self.doc;
        let Some(category) = doc.find_attr(elem, self.tags.category) else {
            return;
        };
        match doc.str(category) {
            "struct" => self.process_struct_type(id, elem),
            "handle" => self.process_handle_type(id, elem),
            "basetype" => self.process_base_type(elem),
            "union" => self.process_union_type(elem),
            "enum" => self.process_enum_type(elem),
            "bitmask" => self.process_bitmask_type(elem),
            _ => {}
        }
    }

    fn process_struct_type(&mut self, id: ElemId, elem: &Element) {
        let doc = self.doc;
        let full = doc.find_attr(elem, self.tags.name).map_or("", |v| doc.str(v));
        let stripped = full.strip_prefix("Vk");
        if let Some(name) = stripped {
            if let Some(alias) = doc.find_attr(elem, self.tags.alias) {
                self.process_alias(alias, name);
            } else if name.starts_with("Base") {
                // The pNext base structs stay opaque.
                self.add_raw(name);
            } else {
                for (_, member) in doc.tagged_children(elem, self.tags.member) {
                    if let Some(ty) = doc.child_text(&member, self.tags.type_) {
                        if let Some(ty) = doc.str(ty).strip_prefix("Vk") {
                            if ty != name {
                                self.deps.insert(ty, name);
                            }
                        }
                    }
                }
                self.push_type(TypeKind::Struct, name, Some(id));
                self.structs.insert(name);
            }
        }
        if let Some(extends) = doc.find_attr(elem, self.tags.structextends) {
            let name = stripped.unwrap_or(full);
            for target in doc.str(extends).split(',') {
                if let Some(target) = target.strip_prefix("Vk") {
                    self.deps.insert(target, name);
                    self.struct_extends.entry(target).or_default().push(id);
                }
            }
        }
    }

    fn process_handle_type(&mut self, id: ElemId, elem: &Element) {
        let doc = self.doc;
        if let Some(name) = doc.child_text(elem, self.tags.name) {
            if let Some(name) = doc.str(name).strip_prefix("Vk") {
                self.handle_commands.entry(name).or_default();
                if doc.find_attr(elem, self.tags.objtypeenum).is_some() {
                    self.deps.insert("ObjectType", name);
                }
                self.push_type(TypeKind::Handle, name, Some(id));
            }
        } else if let Some(name) = doc.find_attr(elem, self.tags.name) {
            if let Some(name) = doc.str(name).strip_prefix("Vk") {
                if let Some(alias) = doc.find_attr(elem, self.tags.alias) {
                    self.process_alias(alias, name);
                }
            }
        }
    }

    fn process_base_type(&mut self, elem: &Element) {
        if let Some(name) = self.doc.child_text(elem, self.tags.name) {
            if let Some(name) = self.doc.str(name).strip_prefix("Vk") {
                self.add_raw(name);
            }
        }
    }

    fn process_union_type(&mut self, elem: &Element) {
        if let Some(name) = self.doc.find_attr(elem, self.tags.name) {
            if let Some(name) = self.doc.str(name).strip_prefix("Vk") {
                self.add_raw(name);
            }
        }
    }

    fn process_enum_type(&mut self, elem: &Element) {
        let doc = self.doc;
        if let Some(name) = doc.find_attr(elem, self.tags.name) {
            if let Some(name) = doc.str(name).strip_prefix("Vk") {
                self.enum_or_flag.insert(name);
                if let Some(alias) = doc.find_attr(elem, self.tags.alias) {
                    self.process_alias(alias, name);
                }
            }
        }
    }

    fn process_bitmask_type(&mut self, elem: &Element) {
        let doc = self.doc;
        if !self.check_api(elem) {
            return;
        }
        if let Some(alias) = doc.find_attr(elem, self.tags.alias) {
            if let Some(name) = doc.find_attr(elem, self.tags.name) {
                if let Some(name) = doc.str(name).strip_prefix("Vk") {
                    self.enum_or_flag.insert(name);
                    self.process_alias(alias, name);
                }
            }
            return;
        }
        let enum_attr = doc
            .find_attr(elem, self.tags.bitvalues)
            .or_else(|| doc.find_attr(elem, self.tags.requires));
        let Some(name) = doc.child_text(elem, self.tags.name) else {
            return;
        };
        let Some(name) = doc.str(name).strip_prefix("Vk") else {
            return;
        };
        let Some(ty) = doc.child_text(elem, self.tags.type_) else {
            return;
        };
        let Some(ty) = doc.str(ty).strip_prefix("Vk") else {
            return;
        };
        let enum_ty = match enum_attr {
            Some(attr) => match doc.str(attr).strip_prefix("Vk") {
                Some(enum_ty) => {
                    self.deps.insert(enum_ty, name);
                    Some(enum_ty)
                }
                // An enum reference outside the registry's own namespace.
                None => return,
            },
            None => None,
        };
        self.enum_or_flag.insert(name);
        self.type_ids.push(TypeId {
            kind: TypeKind::Bitmask,
            index: self.bitmask_infos.len() as u32,
        });
        self.bitmask_infos.push(BitmaskInfo { name, ty, enum_ty });
    }

    fn process_alias(&mut self, alias: StrId, name: &'static str) {
        if let Some(target) = self.doc.str(alias).strip_prefix("Vk") {
            self.deps.insert(target, name);
            self.type_ids.push(TypeId {
                kind: TypeKind::Alias,
                index: self.alias_infos.len() as u32,
            });
            self.alias_infos.push(AliasInfo { name, target });
        }
    }

    fn process_feature(&mut self, id: ElemId, guard: StrId) {
        let doc = self.doc;
        let elem = doc.element(id);
        if let Some(depends) = doc.find_attr(&elem, self.tags.depends) {
            for item in doc.str(depends).split(',') {
                // Internal features are spliced in under the outer guard,
                // each at most once.
                if let Some(dep) = self.internal_features.remove(item) {
                    self.process_feature(dep, guard);
                }
            }
        }
        self.process_require_list(&elem, guard);
        for (_, remove) in doc.tagged_children(&elem, self.tags.remove) {
            if let Some(name) = doc.find_attr(&remove, self.tags.name) {
                let name = doc.str(name);
                if let Some(name) = name.strip_prefix("Vk").or_else(|| name.strip_prefix("vk")) {
                    self.supported.remove(name);
                }
            }
        }
    }

    fn process_extension(&mut self, elem: &Element) {
        let doc = self.doc;
        let Some(supported) = doc.find_attr(elem, self.tags.supported) else {
            return;
        };
        if !doc.str(supported).split(',').any(|item| item == "vulkan") {
            return;
        }
        if doc.find_attr(elem, self.tags.deprecatedby).is_some() {
            return;
        }
        if doc.find_attr(elem, self.tags.provisional).is_some() {
            return;
        }
        let guard = doc.find_attr(elem, self.tags.name).unwrap_or_default();
        self.process_require_list(elem, guard);
    }

    fn process_require_list(&mut self, elem: &Element, guard: StrId) {
        let doc = self.doc;
        self.scopes.insert(doc.str(guard));
        'require: for (_, require) in doc.tagged_children(elem, self.tags.require) {
            if !self.check_api(&require) {
                continue;
            }
            if let Some(depends) = doc.find_attr(&require, self.tags.depends) {
                for item in doc.str(depends).split(',') {
                    if !self.scopes.contains(item) {
                        continue 'require;
                    }
                }
            }
            for node in doc.children(&require) {
                let Node::Element(child_id) = node else { continue };
                let child = doc.element(child_id);
                if child.tag == self.tags.enum_ {
                    if let Some(extends) = doc.find_attr(&child, self.tags.extends) {
                        if let Some(target) = doc.str(extends).strip_prefix("Vk") {
                            self.enum_extends
                                .entry(target)
                                .or_default()
                                .push(EnumExtend { elem: child_id, guard });
                        }
                    }
                } else if child.tag == self.tags.type_ {
                    if let Some(name) = doc.find_attr(&child, self.tags.name) {
                        if let Some(name) = doc.str(name).strip_prefix("Vk") {
                            self.supported.entry(name).or_insert(guard);
                        }
                    }
                } else if child.tag == self.tags.command {
                    if let Some(name) = doc.find_attr(&child, self.tags.name) {
                        if let Some(name) = doc.str(name).strip_prefix("vk") {
                            self.supported.entry(name).or_insert(guard);
                        }
                    }
                }
            }
        }
    }

    fn process_command(&mut self, id: ElemId, elem: &Element) {
        let doc = self.doc;
        if !self.check_api(elem) {
            return;
        }
        if let Some(alias) = doc.find_attr(elem, self.tags.alias) {
            let Some(name) = doc.find_attr(elem, self.tags.name) else {
                return;
            };
            let Some(&target) = self.command_elems.get(doc.str(alias)) else {
                return;
            };
            match target.first_param_ty {
                Some(ty) => {
                    if let Some(ty) = doc.str(ty).strip_prefix("Vk") {
                        if let Some(commands) = self.handle_commands.get_mut(ty) {
                            commands.push(CommandInfo { name, elem: target.elem });
                        }
                    }
                }
                None => self.global_commands.push(CommandInfo { name, elem: target.elem }),
            }
            return;
        }
        let mut children = doc.children(elem);
        let Some(Node::Element(proto_id)) = children.next() else {
            return;
        };
        let proto = doc.element(proto_id);
        if proto.tag != self.tags.proto {
            return;
        }
        let Some(Node::Element(param_id)) = children.next() else {
            return;
        };
        let param = doc.element(param_id);
        if param.tag != self.tags.param {
            return;
        }
        let name = doc.child_text(&proto, self.tags.name).unwrap_or_default();
        let first_param_ty = doc.child_text(&param, self.tags.type_);
        self.command_elems
            .insert(doc.str(name), CommandTarget { first_param_ty, elem: id });
        let mut receiver: Option<&'static str> = None;
        if let Some(ty) = first_param_ty {
            if let Some(ty) = doc.str(ty).strip_prefix("Vk") {
                if let Some(commands) = self.handle_commands.get_mut(ty) {
                    commands.push(CommandInfo { name, elem: id });
                    receiver = Some(ty);
                }
            }
        }
        let Some(receiver) = receiver else {
            self.global_commands.push(CommandInfo { name, elem: id });
            return;
        };
        // Handles passed as later parameters must be declared before the
        // receiving handle.
        for node in children {
            let Node::Element(param_id) = node else { continue };
            let param = doc.element(param_id);
            if param.tag != self.tags.param {
                continue;
            }
            if let Some(ty) = doc.child_text(&param, self.tags.type_) {
                if let Some(ty) = doc.str(ty).strip_prefix("Vk") {
                    if ty != receiver {
                        self.deps.insert(ty, receiver);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{elem, encode, ElemDesc};

    fn catalog(root: &ElemDesc) -> Catalog {
        let doc = Document::new(Box::leak(encode(root).into_boxed_slice()));
        let mut catalog = Catalog::new(doc);
        catalog.process();
        catalog
    }

    fn feature(name: &str) -> ElemDesc {
        elem("feature").attr("api", "vulkan").attr("name", name)
    }

    fn require_type(name: &str) -> ElemDesc {
        elem("require").child(elem("type").attr("name", name))
    }

    #[test]
    fn support_keeps_the_first_enabling_scope() {
        let cat = catalog(
            &elem("registry")
                .child(
                    elem("types")
                        .child(elem("type").attr("category", "basetype").child(elem("name").text("VkBool32"))),
                )
                .child(feature("VK_VERSION_1_0").child(require_type("VkBool32")))
                .child(feature("VK_VERSION_1_1").child(require_type("VkBool32"))),
        );
        let guard = cat.find_support("Bool32").unwrap();
        assert_eq!(cat.doc.str(guard), "VK_VERSION_1_0");
    }

    #[test]
    fn remove_deletes_support() {
        let cat = catalog(
            &elem("registry")
                .child(
                    elem("types")
                        .child(elem("type").attr("category", "basetype").child(elem("name").text("VkBool32"))),
                )
                .child(feature("VK_VERSION_1_0").child(require_type("VkBool32")))
                .child(feature("VK_VERSION_1_1").child(elem("remove").attr("name", "VkBool32"))),
        );
        assert_eq!(cat.find_support("Bool32"), None);
    }

    #[test]
    fn extensions_are_filtered() {
        let cat = catalog(
            &elem("registry").child(
                elem("extensions")
                    .child(
                        elem("extension")
                            .attr("name", "VK_KHR_good")
                            .attr("supported", "vulkan")
                            .child(require_type("VkA")),
                    )
                    .child(
                        elem("extension")
                            .attr("name", "VK_KHR_other_api")
                            .attr("supported", "vulkansc")
                            .child(require_type("VkB")),
                    )
                    .child(
                        elem("extension")
                            .attr("name", "VK_KHR_dead")
                            .attr("supported", "vulkan")
                            .attr("deprecatedby", "VK_KHR_good")
                            .child(require_type("VkC")),
                    )
                    .child(
                        elem("extension")
                            .attr("name", "VK_KHR_maybe")
                            .attr("supported", "vulkan")
                            .attr("provisional", "true")
                            .child(require_type("VkD")),
                    ),
            ),
        );
        assert!(cat.is_supported("A"));
        assert!(!cat.is_supported("B"));
        assert!(!cat.is_supported("C"));
        assert!(!cat.is_supported("D"));
    }

    #[test]
    fn require_depends_on_unknown_scope_is_skipped() {
        let cat = catalog(
            &elem("registry").child(
                feature("VK_VERSION_1_0")
                    .child(require_type("VkKept"))
                    .child(
                        elem("require")
                            .attr("depends", "VK_KHR_not_seen")
                            .child(elem("type").attr("name", "VkDropped")),
                    )
                    .child(
                        elem("require")
                            .attr("depends", "VK_VERSION_1_0")
                            .child(elem("type").attr("name", "VkAlsoKept")),
                    ),
            ),
        );
        assert!(cat.is_supported("Kept"));
        assert!(!cat.is_supported("Dropped"));
        assert!(cat.is_supported("AlsoKept"));
    }

    #[test]
    fn internal_features_splice_under_the_outer_guard() {
        let cat = catalog(
            &elem("registry")
                .child(
                    feature("VK_INTERNAL_expr")
                        .attr("apitype", "internal")
                        .child(require_type("VkInner")),
                )
                .child(
                    feature("VK_VERSION_1_2")
                        .attr("depends", "VK_INTERNAL_expr")
                        .child(require_type("VkOuter")),
                ),
        );
        let inner = cat.find_support("Inner").unwrap();
        assert_eq!(cat.doc.str(inner), "VK_VERSION_1_2");
        assert!(cat.is_supported("Outer"));
    }

    #[test]
    fn vendor_tags_drive_suffix_lookup() {
        let cat = catalog(
            &elem("registry").child(
                elem("tags")
                    .child(elem("tag").attr("name", "KHR"))
                    .child(elem("tag").attr("name", "EXT")),
            ),
        );
        assert_eq!(cat.vendor_suffix("SHADER_READ_KHR"), Some("KHR"));
        assert_eq!(cat.vendor_suffix("SHADER_READ_BIT"), None);
        assert_eq!(cat.vendor_suffix("NOUNDERSCORE"), None);
    }

    fn handle_type(name: &str) -> ElemDesc {
        elem("type")
            .attr("category", "handle")
            .attr("objtypeenum", "ignored")
            .child(elem("type").text("VK_DEFINE_HANDLE"))
            .text("(")
            .child(elem("name").text(name))
            .text(")")
    }

    fn command(ret: &str, name: &str, params: &[(&str, &str)]) -> ElemDesc {
        let mut cmd = elem("command").child(
            elem("proto")
                .child(elem("type").text(ret))
                .text(" ")
                .child(elem("name").text(name)),
        );
        for (ty, pname) in params {
            cmd = cmd.child(
                elem("param")
                    .child(elem("type").text(ty))
                    .text(" ")
                    .child(elem("name").text(pname)),
            );
        }
        cmd
    }

    #[test]
    fn commands_route_to_handles_and_aliases_follow() {
        let cat = catalog(
            &elem("registry")
                .child(elem("types").child(handle_type("VkDevice")).child(handle_type("VkQueue")))
                .child(
                    elem("commands")
                        .child(command("void", "vkGetDeviceQueue", &[
                            ("VkDevice", "device"),
                            ("uint32_t", "queueFamilyIndex"),
                        ]))
                        .child(command("VkResult", "vkEnumerateThings", &[("uint32_t", "count")]))
                        .child(
                            elem("command")
                                .attr("name", "vkGetDeviceQueue2")
                                .attr("alias", "vkGetDeviceQueue"),
                        ),
                ),
        );
        let device = cat.commands_of("Device");
        assert_eq!(device.len(), 2);
        assert_eq!(cat.doc.str(device[0].name), "vkGetDeviceQueue");
        assert_eq!(cat.doc.str(device[1].name), "vkGetDeviceQueue2");
        // The alias reuses the target's element.
        assert_eq!(device[0].elem, device[1].elem);
        assert_eq!(cat.global_commands.len(), 1);
        assert_eq!(cat.doc.str(cat.global_commands[0].name), "vkEnumerateThings");
        assert!(cat.commands_of("Queue").is_empty());
    }

    #[test]
    fn handle_parameters_add_declaration_edges() {
        let cat = catalog(
            &elem("registry")
                .child(elem("types").child(handle_type("VkDevice")).child(handle_type("VkQueue")))
                .child(elem("commands").child(command("void", "vkQueueBind", &[
                    ("VkQueue", "queue"),
                    ("VkDevice", "device"),
                ]))),
        );
        assert!(cat.deps.contains("Device", "Queue"));
        assert!(!cat.deps.contains("Queue", "Device"));
    }

    #[test]
    fn struct_members_and_extensions_add_edges() {
        let cat = catalog(
            &elem("registry").child(
                elem("types")
                    .child(
                        elem("type")
                            .attr("category", "struct")
                            .attr("name", "VkExtent2D")
                            .child(
                                elem("member")
                                    .child(elem("type").text("uint32_t"))
                                    .text(" ")
                                    .child(elem("name").text("width")),
                            ),
                    )
                    .child(
                        elem("type")
                            .attr("category", "struct")
                            .attr("name", "VkRect2D")
                            .attr("structextends", "VkExtent2D")
                            .child(
                                elem("member")
                                    .child(elem("type").text("VkExtent2D"))
                                    .text(" ")
                                    .child(elem("name").text("extent")),
                            ),
                    ),
            ),
        );
        assert!(cat.deps.contains("Extent2D", "Rect2D"));
        assert_eq!(cat.struct_extends_of("Extent2D").len(), 1);
        assert!(cat.is_struct("Rect2D"));
        assert!(cat.is_struct("Extent2D"));
    }

    #[test]
    fn base_structs_stay_raw() {
        let cat = catalog(
            &elem("registry").child(
                elem("types").child(
                    elem("type")
                        .attr("category", "struct")
                        .attr("name", "VkBaseOutStructure")
                        .child(
                            elem("member")
                                .child(elem("type").text("VkStructureType"))
                                .text(" ")
                                .child(elem("name").text("sType")),
                        ),
                ),
            ),
        );
        assert!(cat.is_raw("BaseOutStructure"));
        assert!(!cat.is_struct("BaseOutStructure"));
        // Raw structs are not introspected for member edges.
        assert!(!cat.deps.contains("StructureType", "BaseOutStructure"));
    }

    #[test]
    fn bitmask_forms() {
        let cat = catalog(
            &elem("registry").child(
                elem("types")
                    .child(
                        elem("type")
                            .attr("category", "bitmask")
                            .attr("bitvalues", "VkAccessFlagBits")
                            .text("typedef ")
                            .child(elem("type").text("VkFlags"))
                            .text(" ")
                            .child(elem("name").text("VkAccessFlags"))
                            .text(";"),
                    )
                    .child(
                        elem("type")
                            .attr("category", "bitmask")
                            .text("typedef ")
                            .child(elem("type").text("VkFlags"))
                            .text(" ")
                            .child(elem("name").text("VkPlainFlags"))
                            .text(";"),
                    )
                    .child(
                        elem("type")
                            .attr("category", "bitmask")
                            .attr("name", "VkOldFlags")
                            .attr("alias", "VkAccessFlags"),
                    ),
            ),
        );
        assert_eq!(cat.bitmask_infos.len(), 2);
        assert_eq!(cat.bitmask_infos[0].enum_ty, Some("AccessFlagBits"));
        assert_eq!(cat.bitmask_infos[1].enum_ty, None);
        assert!(cat.deps.contains("AccessFlagBits", "AccessFlags"));
        assert_eq!(cat.alias_infos.len(), 1);
        assert_eq!(cat.alias_infos[0].name, "OldFlags");
        assert_eq!(cat.alias_infos[0].target, "AccessFlags");
        assert!(cat.deps.contains("AccessFlags", "OldFlags"));
        assert!(cat.is_enum_or_flag("AccessFlags"));
        assert!(cat.is_enum_or_flag("OldFlags"));
    }

    #[test]
    fn sort_orders_aliases_after_targets() {
        let mut cat = catalog(
            &elem("registry")
                .child(
                    elem("types")
                        .child(
                            elem("type")
                                .attr("category", "struct")
                                .attr("name", "VkNewInfo")
                                .attr("alias", "VkOldInfo"),
                        )
                        .child(
                            elem("type")
                                .attr("category", "struct")
                                .attr("name", "VkOldInfo")
                                .child(
                                    elem("member")
                                        .child(elem("type").text("uint32_t"))
                                        .text(" ")
                                        .child(elem("name").text("value")),
                                ),
                        ),
                ),
        );
        let sorted = cat.sort_types();
        assert_eq!(sorted, cat.type_ids.len());
        let names: Vec<_> = cat.type_ids.iter().map(|&id| cat.type_name(id)).collect();
        let old = names.iter().position(|&n| n == "OldInfo").unwrap();
        let new = names.iter().position(|&n| n == "NewInfo").unwrap();
        assert!(old < new);
    }

    #[test]
    fn sort_reports_cycles() {
        let mut cat = catalog(
            &elem("registry").child(
                elem("types")
                    .child(
                        elem("type")
                            .attr("category", "struct")
                            .attr("name", "VkChicken")
                            .child(
                                elem("member")
                                    .child(elem("type").text("VkEgg"))
                                    .text(" ")
                                    .child(elem("name").text("egg")),
                            ),
                    )
                    .child(
                        elem("type")
                            .attr("category", "struct")
                            .attr("name", "VkEgg")
                            .child(
                                elem("member")
                                    .child(elem("type").text("VkChicken"))
                                    .text(" ")
                                    .child(elem("name").text("chicken")),
                            ),
                    ),
            ),
        );
        let sorted = cat.sort_types();
        assert_eq!(sorted, 0);
        assert_eq!(cat.type_ids.len(), 2);
    }
}
