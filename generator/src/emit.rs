//! Walks the ordered catalog and prints the binding header: type aliases,
//! flag sets, enums, struct wrappers, handle wrappers with their methods,
//! and free functions, threading the conditional-compilation guard state
//! through every declaration.

use crate::vars::{self, MemberInfo, MemberTag, ParamInfo};
use registry::catalog::{Catalog, CommandInfo, TypeId, TypeKind};
use registry::doc::{Element, Node, StrId};
use registry::names;
use std::collections::HashSet;
use std::fmt::{self, Write};
use tracing::warn;

/// Guard bracket plus pending-blank-line state threaded through emission.
#[derive(Debug, Default)]
struct GenState {
    delim: bool,
    guard: StrId,
}

pub struct Generator<'a> {
    cat: &'a Catalog,
}

impl<'a> Generator<'a> {
    pub fn new(cat: &'a Catalog) -> Generator<'a> {
        Generator { cat }
    }

    pub fn generate(&self, out: &mut String) -> fmt::Result {
        out.push_str(
            "#ifndef VKLITE_VULKAN_HPP\n\
             #define VKLITE_VULKAN_HPP\n\
             \n\
             #include \"core.hpp\"\n\
             \n\
             namespace vklite {\n",
        );
        let mut state = GenState::default();
        let mut last_kind = TypeKind::Raw;
        for &type_id in &self.cat.type_ids {
            if last_kind != type_id.kind {
                last_kind = type_id.kind;
                state.delim = true;
            }
            match type_id.kind {
                TypeKind::Raw => self.emit_raw(out, type_id, &mut state)?,
                TypeKind::Enum => self.emit_enum(out, type_id, &mut state)?,
                TypeKind::Bitmask => self.emit_bitmask(out, type_id, &mut state)?,
                TypeKind::Alias => self.emit_alias(out, type_id, &mut state)?,
                TypeKind::Struct => self.emit_struct(out, type_id, &mut state)?,
                TypeKind::Handle => self.emit_handle(out, type_id, &mut state)?,
            }
        }
        state.delim = true;
        for cmd in &self.cat.global_commands {
            self.emit_command(out, cmd, "", StrId::NONE, &mut state)?;
        }
        self.update_guard(out, StrId::NONE, &mut state)?;
        out.push_str("}\n\n#endif // VKLITE_VULKAN_HPP");
        Ok(())
    }

    /// Closes the open guard when `guard` differs from it, and returns the
    /// guard the caller still has to open (NONE when unchanged).
    fn update_guard(
        &self,
        out: &mut String,
        guard: StrId,
        state: &mut GenState,
    ) -> Result<StrId, fmt::Error> {
        if guard == state.guard {
            return Ok(StrId::NONE);
        }
        if state.guard.present() {
            writeln!(out, "#endif // {}", self.cat.doc.str(state.guard))?;
        }
        state.guard = guard;
        Ok(guard)
    }

    fn open_guard(&self, out: &mut String, guard: StrId) -> fmt::Result {
        if guard.present() {
            writeln!(out, "#if {}", self.cat.doc.str(guard))?;
        }
        Ok(())
    }

    /// A nested guard is needed only when the declaration's scope is
    /// stricter than the enclosing one.
    fn sub_guard(base: StrId, guard: StrId) -> StrId {
        if guard > base {
            guard
        } else {
            StrId::NONE
        }
    }

    fn emit_raw(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let info = &self.cat.type_infos[id.index as usize];
        let Some(support) = self.cat.find_support(info.name) else {
            return Ok(());
        };
        let guard = self.update_guard(out, support, state)?;
        if state.delim {
            out.push('\n');
            state.delim = false;
        }
        self.open_guard(out, guard)?;
        writeln!(out, "using {} = Vk{};", info.name, info.name)
    }

    fn emit_alias(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let info = &self.cat.alias_infos[id.index as usize];
        let Some(support) = self.cat.find_support(info.name) else {
            return Ok(());
        };
        let guard = self.update_guard(out, support, state)?;
        if state.delim {
            out.push('\n');
            state.delim = false;
        }
        self.open_guard(out, guard)?;
        writeln!(out, "using {} = {};", info.name, info.target)
    }

    fn emit_bitmask(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let info = &self.cat.bitmask_infos[id.index as usize];
        let Some(support) = self.cat.find_support(info.name) else {
            return Ok(());
        };
        match info.enum_ty.filter(|e| self.cat.is_supported(e)) {
            None => {
                let guard = self.update_guard(out, support, state)?;
                if state.delim {
                    out.push('\n');
                    state.delim = false;
                }
                self.open_guard(out, guard)?;
                writeln!(out, "using {} = {};", info.name, info.ty)
            }
            Some(enum_ty) => {
                let guard = self.update_guard(out, support, state)?;
                out.push('\n');
                state.delim = true;
                self.open_guard(out, guard)?;
                writeln!(out, "using {} = FlagSet<{}, {}>;", info.name, enum_ty, info.ty)?;
                writeln!(
                    out,
                    "constexpr {} operator|({} a, {} b) noexcept {{ return {}({}(a) | {}(b)); }}",
                    info.name, enum_ty, enum_ty, info.name, info.ty, info.ty
                )
            }
        }
    }

    fn emit_enum(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let cat = self.cat;
        let doc = cat.doc;
        let info = &cat.type_infos[id.index as usize];
        let Some(support) = cat.find_support(info.name) else {
            return Ok(());
        };
        let Some(nm) = names::match_name(info.name) else {
            warn!("bad enum name: {}", info.name);
            return Ok(());
        };
        let Some(elem_id) = info.elem else {
            return Ok(());
        };
        let elem = doc.element(elem_id);
        let is_bitmask =
            matches!(doc.find_attr(&elem, cat.tags.type_), Some(v) if doc.str(v) == "bitmask");
        let mut stem = nm.stem;
        if is_bitmask {
            let Some(flag_stem) = stem.strip_suffix("FlagBits") else {
                warn!("bad bitmask name: {}", stem);
                return Ok(());
            };
            stem = flag_stem;
        }
        let guard = self.update_guard(out, support, state)?;
        out.push('\n');
        state.delim = true;
        self.open_guard(out, guard)?;
        if let Some(comment) = doc.find_attr(&elem, cat.tags.comment) {
            writeln!(out, "// {}", doc.str(comment))?;
        }
        write!(out, "enum class {} : ", info.name)?;
        if let Some(bitwidth) = doc.find_attr(&elem, cat.tags.bitwidth) {
            write!(out, "uint{}_t", doc.str(bitwidth))?;
        } else if is_bitmask {
            out.push_str("uint32_t");
        } else {
            out.push_str("int32_t");
        }
        out.push_str(" {\n");

        let mut prefix = String::from("VK_");
        let is_result = info.name == "Result";
        if !is_result {
            names::camel_to_upper_snake(stem, &mut prefix);
            if !nm.digits.is_empty() {
                prefix.push('_');
                prefix.push_str(nm.digits);
            }
            prefix.push('_');
        }

        let mut result_values: Vec<(String, StrId)> = Vec::new();
        let mut unique_ids: HashSet<&'static str> = HashSet::new();
        let mut value_state = GenState::default();
        let mut emit_value = |out: &mut String, velem: &Element, ext_guard: StrId| -> fmt::Result {
            if doc.find_attr(velem, cat.tags.deprecated).is_some() {
                return Ok(());
            }
            let name = doc.find_attr(velem, cat.tags.name).map_or("", |v| doc.str(v));
            let Some(mut sub) = name.strip_prefix(prefix.as_str()) else {
                return Ok(());
            };
            // Injected values may repeat across extensions; keep the first.
            if ext_guard.present() && !unique_ids.insert(sub) {
                return Ok(());
            }
            let vendor = cat.vendor_suffix(sub).unwrap_or("");
            if !vendor.is_empty() {
                sub = &sub[..sub.len() - vendor.len() - 1];
            }
            let mut value_name = String::from("e");
            if is_bitmask {
                if let Some(bit) = sub.strip_suffix("_BIT") {
                    value_name = String::from("b");
                    sub = bit;
                }
            }
            names::upper_snake_to_lower_camel(sub, &mut value_name);
            if nm.vendor != vendor {
                value_name.push_str(vendor);
            }
            let open = self.update_guard(out, ext_guard, &mut value_state)?;
            self.open_guard(out, open)?;
            if let Some(comment) = doc.find_attr(velem, cat.tags.comment) {
                writeln!(out, "  // {}", doc.str(comment))?;
            }
            writeln!(out, "  {} = {},", value_name, name)?;
            if is_result && doc.find_attr(velem, cat.tags.alias).is_none() {
                result_values.push((value_name, ext_guard));
            }
            Ok(())
        };
        for (_, velem) in doc.tagged_children(&elem, cat.tags.enum_) {
            emit_value(out, &velem, StrId::NONE)?;
        }
        for extend in cat.enum_extends_of(info.name) {
            emit_value(out, &doc.element(extend.elem), extend.guard)?;
        }
        self.update_guard(out, StrId::NONE, &mut value_state)?;
        out.push_str("};\n");

        if is_result {
            out.push_str(
                "\ninline const char* getResultText(Result r) noexcept {\n\
                 \x20 using enum Result;\n\
                 \x20 switch (r) {\n",
            );
            let mut text_state = GenState::default();
            for (value_name, guard) in &result_values {
                let open = self.update_guard(out, *guard, &mut text_state)?;
                self.open_guard(out, open)?;
                writeln!(out, "  case {}: return \"{}\";", value_name, &value_name[1..])?;
            }
            self.update_guard(out, StrId::NONE, &mut text_state)?;
            out.push_str("  default: return \"\";\n  }\n}\n");
        }
        Ok(())
    }

    fn emit_struct(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let cat = self.cat;
        let doc = cat.doc;
        let info = &cat.type_infos[id.index as usize];
        let Some(support) = cat.find_support(info.name) else {
            return Ok(());
        };
        let Some(elem_id) = info.elem else {
            return Ok(());
        };
        let elem = doc.element(elem_id);
        let returned_only = doc.find_attr(&elem, cat.tags.returnedonly).is_some();

        let mut members: Vec<MemberInfo> = Vec::new();
        for (_, member_elem) in doc.tagged_children(&elem, cat.tags.member) {
            if !cat.check_api(&member_elem) {
                continue;
            }
            let Some(name_txt) = doc.child_text(&member_elem, cat.tags.name) else {
                continue;
            };
            let name = doc.str(name_txt);
            if matches!(name, "pNext" | "matrix" | "ppGeometries" | "ppUsageCounts") {
                continue;
            }
            let mut minfo = vars::member_info(cat, &member_elem);
            if returned_only {
                if minfo.is_arr {
                    // A trailing {xxxCount, xxxs[N]} pair reads back as a
                    // span sized by the count member.
                    let collapse = members.last().and_then(|prev| {
                        let stem = minfo.var.name.strip_suffix('s')?;
                        let prev_stem = prev.var.name.strip_suffix("Count")?;
                        (stem == prev_stem).then_some(prev.var.name)
                    });
                    if let Some(count_name) = collapse {
                        let cut = minfo.new_type.len() - (minfo.var.array.len() + 3);
                        minfo.new_type.truncate(cut);
                        minfo.new_type.push('>');
                        minfo.var.array = count_name;
                        members.pop();
                    }
                }
            } else if !minfo.optional {
                if minfo.new_type == "Bool32" {
                    minfo.optional = true;
                } else if let Some(len) = doc.find_attr(&member_elem, cat.tags.len) {
                    minfo.optional = vars::any_optional_member(&members, doc.str(len));
                }
            }
            if !members.is_empty() && minfo.var.name == "objectHandle" && minfo.new_type == "uint64_t"
            {
                let prev_matches = matches!(
                    members.last(),
                    Some(prev) if prev.var.name == "objectType" && prev.new_type == "ObjectType"
                );
                if prev_matches {
                    if let Some(prev) = members.last_mut() {
                        prev.slave_name = ".type";
                        prev.tag = MemberTag::Slave;
                    }
                    minfo.slave_name = ".handle";
                    minfo.tag = MemberTag::Slave;
                    let mut master = minfo.clone();
                    members.push(minfo);
                    master.new_type = String::from("Object");
                    master.var.name = "object";
                    master.tag = MemberTag::Master(2);
                    minfo = master;
                }
            }
            members.push(minfo);
        }

        let guard = self.update_guard(out, support, state)?;
        out.push('\n');
        state.delim = true;
        self.open_guard(out, guard)?;
        if let Some(comment) = doc.find_attr(&elem, cat.tags.comment) {
            writeln!(out, "// {}", doc.str(comment))?;
        }
        writeln!(out, "struct {} : Vk{} {{", info.name, info.name)?;

        // Default constructor pre-writes the fixed-value members.
        write!(out, "  {}() noexcept : Vk{}{{", info.name, info.name)?;
        let mut delim = false;
        for member in &members {
            if let Some(value) = member.values_attr {
                if delim {
                    out.push_str(", ");
                } else {
                    delim = true;
                }
                write!(out, ".{} = {}", member.var.name, doc.str(value))?;
            }
        }
        out.push_str("} {}\n");

        let all_required = !returned_only
            && !members.is_empty()
            && members.iter().all(|m| {
                !m.optional && m.values_attr.is_none() && m.tag != MemberTag::Slave
            });
        if all_required {
            write!(out, "  {}(", info.name)?;
            let mut delim = false;
            for member in &members {
                if delim {
                    out.push_str(", ");
                } else {
                    delim = true;
                }
                write!(out, "{} {}", member.new_type, member.var.name)?;
            }
            write!(out, ") noexcept : Vk{}{{", info.name)?;
            delim = false;
            for member in &members {
                if !member.is_arr && member.tag == MemberTag::Normal {
                    if delim {
                        out.push_str(", ");
                    } else {
                        delim = true;
                    }
                    write!(out, ".{} = ", member.var.name)?;
                    self.member_init(out, member, member.var.name, "")?;
                }
            }
            out.push_str("} {");
            let mut any = false;
            for member in &members {
                if !member.is_arr && !matches!(member.tag, MemberTag::Master(_)) {
                    continue;
                }
                any = true;
                out.push_str(" set");
                member_name(out, member.var.name, member.is_ptr);
                write!(out, "({});", member.var.name)?;
            }
            if any {
                out.push(' ');
            }
            out.push_str("}\n");
        }

        let visible: Vec<usize> = (0..members.len())
            .filter(|&i| members[i].values_attr.is_none())
            .collect();
        if !visible.is_empty() {
            out.push('\n');
            let (required, optional): (Vec<usize>, Vec<usize>) =
                visible.iter().copied().partition(|&i| !members[i].optional);
            for &i in &required {
                self.emit_member(out, &members, i, returned_only)?;
            }
            if !optional.is_empty() {
                if !required.is_empty() {
                    out.push('\n');
                }
                for &i in &optional {
                    self.emit_member(out, &members, i, returned_only)?;
                }
            }
        }

        let extenders = cat.struct_extends_of(info.name);
        if !extenders.is_empty() {
            out.push('\n');
            let mut ext_state = GenState::default();
            for &ext_id in extenders {
                let ext_elem = doc.element(ext_id);
                let full = doc.find_attr(&ext_elem, cat.tags.name).map_or("", |v| doc.str(v));
                let ext_name = full.get(2..).unwrap_or("");
                let Some(ext_support) = cat.find_support(ext_name) else {
                    continue;
                };
                let open =
                    self.update_guard(out, Self::sub_guard(state.guard, ext_support), &mut ext_state)?;
                self.open_guard(out, open)?;
                out.push_str("  void attach");
                if cat.is_struct_extended(ext_name) {
                    out.push_str("Head");
                }
                writeln!(out, "(struct {}&);", ext_name)?;
            }
            self.update_guard(out, StrId::NONE, &mut ext_state)?;
        }
        out.push_str("};\n");

        if let Some(extends) = doc.find_attr(&elem, cat.tags.structextends) {
            let mut ext_state = GenState::default();
            for target in doc.str(extends).split(',') {
                let Some(target) = target.strip_prefix("Vk") else {
                    continue;
                };
                let Some(ext_support) = cat.find_support(target) else {
                    continue;
                };
                let open =
                    self.update_guard(out, Self::sub_guard(state.guard, ext_support), &mut ext_state)?;
                self.open_guard(out, open)?;
                write!(out, "inline void {}::attach", target)?;
                if !extenders.is_empty() {
                    out.push_str("Head");
                }
                write!(out, "({}& ext) {{ ", info.name)?;
                if extenders.is_empty() {
                    out.push_str("ext.pNext = const_cast<void*>(pNext); ");
                }
                out.push_str("pNext = &ext; }\n");
            }
            self.update_guard(out, StrId::NONE, &mut ext_state)?;
        }
        Ok(())
    }

    fn member_init(&self, out: &mut String, m: &MemberInfo, name: &str, sub: &str) -> fmt::Result {
        let add_cast = m.add_cast && !m.is_struct;
        if add_cast {
            write!(
                out,
                "std::bit_cast<{}Vk{}{}>(",
                m.var.type_prefix, m.var.ty, m.var.type_suffix
            )?;
        }
        out.push_str(name);
        out.push_str(sub);
        if add_cast {
            out.push(')');
        }
        Ok(())
    }

    fn member_set_slot(&self, out: &mut String, m: &MemberInfo) -> fmt::Result {
        if m.is_arr {
            if m.is_str {
                write!(
                    out,
                    "const auto len = std::max<std::size_t>({} - 1, value.size()); ",
                    m.var.array
                )?;
            }
            write!(out, "std::memcpy(&this->{}, value.data(), ", m.var.name)?;
            if m.is_str {
                write!(out, "len); this->{}[len] = '\\0'", m.var.name)?;
            } else {
                out.push_str("value.size_bytes())");
            }
        } else {
            write!(out, "this->{} = ", m.var.name)?;
            self.member_init(out, m, "value", m.slave_name)?;
        }
        Ok(())
    }

    fn member_get_slot(&self, out: &mut String, m: &MemberInfo) -> fmt::Result {
        if m.is_arr {
            if m.add_cast {
                write!(
                    out,
                    "{}(std::bit_cast<const {}{}{}*>(&this->{}), {})",
                    m.new_type, m.var.type_prefix, m.var.ty, m.var.type_suffix, m.var.name, m.var.array
                )?;
            } else {
                write!(out, "this->{}", m.var.name)?;
            }
        } else {
            if m.add_cast {
                if m.is_struct {
                    write!(
                        out,
                        "static_cast<const {}{}{}&>(",
                        m.var.type_prefix, m.var.ty, m.var.type_suffix
                    )?;
                } else {
                    write!(
                        out,
                        "std::bit_cast<{}{}{}>(",
                        m.var.type_prefix, m.var.ty, m.var.type_suffix
                    )?;
                }
            }
            write!(out, "this->{}", m.var.name)?;
            if m.add_cast {
                out.push(')');
            }
        }
        Ok(())
    }

    fn emit_member(
        &self,
        out: &mut String,
        members: &[MemberInfo],
        index: usize,
        returned_only: bool,
    ) -> fmt::Result {
        let m = &members[index];
        if m.tag == MemberTag::Slave {
            return Ok(());
        }
        if !m.var.comment.is_empty() {
            writeln!(out, "  // {}", m.var.comment)?;
        }
        let slots: &[MemberInfo] = match m.tag {
            MemberTag::Master(n) => &members[index - n as usize..index],
            _ => &[],
        };
        if !returned_only {
            out.push_str("  void set");
            member_name(out, m.var.name, m.is_ptr);
            write!(out, "({} value) {{ ", m.new_type)?;
            if slots.is_empty() {
                self.member_set_slot(out, m)?;
            } else {
                for (i, slot) in slots.iter().enumerate() {
                    if i != 0 {
                        out.push_str("; ");
                    }
                    self.member_set_slot(out, slot)?;
                }
            }
            out.push_str("; }\n");
        }
        out.push_str("  ");
        out.push_str(&m.new_type);
        out.push_str(" get");
        member_name(out, m.var.name, m.is_ptr);
        out.push_str("() const { return ");
        if slots.is_empty() {
            self.member_get_slot(out, m)?;
        } else {
            out.push('{');
            for (i, slot) in slots.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                self.member_get_slot(out, slot)?;
            }
            out.push('}');
        }
        out.push_str("; }\n");
        Ok(())
    }

    fn emit_handle(&self, out: &mut String, id: TypeId, state: &mut GenState) -> fmt::Result {
        let info = &self.cat.type_infos[id.index as usize];
        let Some(support) = self.cat.find_support(info.name) else {
            return Ok(());
        };
        let guard = self.update_guard(out, support, state)?;
        if state.delim {
            out.push('\n');
            state.delim = false;
        }
        self.open_guard(out, guard)?;
        write!(
            out,
            "struct {} : Handle<Vk{}, ObjectType::e{}> {{",
            info.name, info.name, info.name
        )?;
        let mut method_state = GenState {
            delim: true,
            guard: StrId::NONE,
        };
        for cmd in self.cat.commands_of(info.name) {
            self.emit_command(out, cmd, info.name, state.guard, &mut method_state)?;
        }
        self.update_guard(out, StrId::NONE, &mut method_state)?;
        out.push_str("};\n");
        Ok(())
    }

    fn emit_command(
        &self,
        out: &mut String,
        cmd: &CommandInfo,
        type_name: &str,
        base_guard: StrId,
        state: &mut GenState,
    ) -> fmt::Result {
        let cat = self.cat;
        let doc = cat.doc;
        let full_name = doc.str(cmd.name);
        let Some(name) = full_name.strip_prefix("vk") else {
            return Ok(());
        };
        let Some(support) = cat.find_support(name) else {
            return Ok(());
        };
        let elem = doc.element(cmd.elem);
        let mut elems = doc.children(&elem).filter_map(|node| match node {
            Node::Element(id) => Some(id),
            Node::Text(_) => None,
        });
        let Some(proto_id) = elems.next() else {
            return Ok(());
        };
        let proto = doc.element(proto_id);
        let ret_full = doc.child_text(&proto, cat.tags.type_).map_or("", |t| doc.str(t));
        let ret = ret_full.strip_prefix("Vk").unwrap_or(ret_full);
        if !type_name.is_empty() {
            // The receiver parameter becomes `this`.
            elems.next();
        }

        let mut params: Vec<ParamInfo> = Vec::new();
        let mut candidate: Option<&'static str> = None;
        for param_id in elems {
            let param_elem = doc.element(param_id);
            if param_elem.tag != cat.tags.param {
                continue;
            }
            if !cat.check_api(&param_elem) {
                continue;
            }
            let (mut pinfo, out_candidate) = vars::param_info(cat, &param_elem);
            candidate = out_candidate;
            if let Some(len) = doc.find_attr(&param_elem, cat.tags.len) {
                if !pinfo.optional {
                    pinfo.optional = vars::any_optional_param(&params, doc.str(len));
                }
            }
            if !params.is_empty() && pinfo.name == "objectHandle" && pinfo.ty == "uint64_t" {
                let prev_matches = matches!(
                    params.last(),
                    Some(prev) if prev.name == "objectType" && prev.ty == "ObjectType"
                );
                if prev_matches {
                    if let Some(prev) = params.last_mut() {
                        prev.name = String::from("object.type");
                        prev.tag = MemberTag::Slave;
                    }
                    pinfo.name = String::from("object.handle");
                    pinfo.tag = MemberTag::Slave;
                    let mut master = pinfo.clone();
                    params.push(pinfo);
                    master.ty = String::from("Object");
                    master.name = String::from("object");
                    master.tag = MemberTag::Master(2);
                    pinfo = master;
                }
            }
            params.push(pinfo);
        }

        let mut use_ret = false;
        let mut use_out = false;
        let mut out_param: Option<ParamInfo> = None;
        let mut out_ty = String::new();
        if let Some(candidate) = candidate {
            use_ret = ret == "Result";
            if use_ret || ret == "void" {
                if let Some(last) = params.last() {
                    if last.ty.matches('*').count() > 1 {
                        use_out = true;
                        let source = if last.cast.is_empty() { &last.ty } else { &last.cast };
                        out_ty = source[..source.len() - 1].to_owned();
                        out_param = params.pop();
                    } else {
                        let lift = match candidate.strip_prefix("Vk") {
                            Some(t) => {
                                cat.is_handle(t) || cat.is_raw(t) || cat.is_enum_or_flag(t)
                            }
                            None => candidate != "void",
                        };
                        if lift {
                            use_out = true;
                            out_ty = candidate.strip_prefix("Vk").unwrap_or(candidate).to_owned();
                            out_param = params.pop();
                        }
                    }
                }
            }
        }

        let open = self.update_guard(out, Self::sub_guard(base_guard, support), state)?;
        if state.delim {
            out.push('\n');
            state.delim = false;
        }
        self.open_guard(out, open)?;
        out.push_str(if type_name.is_empty() { "inline " } else { "  " });
        if use_out {
            if use_ret {
                write!(out, "Ret<{}> ", out_ty)?;
            } else {
                write!(out, "{} ", out_ty)?;
            }
        } else {
            write!(out, "{} ", ret)?;
        }

        // Only the trailing run of optionals keeps defaults; anything before
        // a required parameter has to be passed anyway. pAllocator is the
        // exception every call site expects to omit.
        let mut last_non_opt = params.len();
        while last_non_opt > 0 {
            last_non_opt -= 1;
            if !params[last_non_opt].optional {
                break;
            }
        }
        for param in &mut params[..last_non_opt] {
            if param.optional && param.name != "pAllocator" {
                param.optional = false;
            }
        }

        emit_fn_name(out, type_name, name);
        out.push('(');
        let mut delim = false;
        for param in params.iter().filter(|p| !p.optional && p.tag != MemberTag::Slave) {
            if delim {
                out.push_str(", ");
            } else {
                delim = true;
            }
            write!(out, "{} {}", param.ty, param.name)?;
        }
        for param in params.iter().filter(|p| p.optional && p.tag != MemberTag::Slave) {
            if delim {
                out.push_str(", ");
            } else {
                delim = true;
            }
            write!(out, "{} {} = {{}}", param.ty, param.name)?;
        }
        out.push_str(") ");
        if !type_name.is_empty() {
            out.push_str("const ");
        }
        out.push_str("{ ");

        let mut suffix = ")";
        if use_out {
            write!(out, "{} value; ", out_ty)?;
            if use_ret {
                out.push_str("return {Result(");
                suffix = ")), value}";
            } else {
                suffix = "); return value";
            }
        } else if ret == "Result" {
            out.push_str("return Result(");
            suffix = "))";
        } else if ret != "void" {
            out.push_str("return ");
        }
        write!(out, "vk{}(", name)?;
        let mut delim = false;
        if !type_name.is_empty() {
            out.push_str("this->handle");
            delim = true;
        }
        for param in &params {
            if matches!(param.tag, MemberTag::Master(_)) {
                continue;
            }
            if delim {
                out.push_str(", ");
            } else {
                delim = true;
            }
            if !param.cast.is_empty() {
                write!(out, "std::bit_cast<{}>(", param.cast)?;
            }
            if param.add_ptr {
                out.push('&');
            }
            out.push_str(&param.name);
            if param.is_arr {
                out.push_str(".data()");
            }
            if !param.cast.is_empty() {
                out.push(')');
            }
        }
        if use_out {
            if delim {
                out.push_str(", ");
            }
            match &out_param {
                Some(op) if !op.cast.is_empty() => {
                    write!(out, "std::bit_cast<{}>(&value)", op.cast)?
                }
                _ => out.push_str("&value"),
            }
        }
        out.push_str(suffix);
        out.push_str("; }\n");
        Ok(())
    }
}

/// Prints a member's accessor stem: pointer members drop their leading `p`
/// run, everything else just capitalizes the first letter.
fn member_name(out: &mut String, name: &str, is_ptr: bool) {
    if is_ptr {
        let rest = name.trim_start_matches('p');
        if rest.len() != name.len() {
            out.push_str(rest);
            return;
        }
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        out.push(first.to_ascii_uppercase());
        out.push_str(chars.as_str());
    }
}

/// Derives the method name: `Get`/`Destroy` prefixes become `get`/`destroy`,
/// the owning type's name is dropped as both prefix and suffix, and the
/// remainder starts lowercase.
fn emit_fn_name(out: &mut String, type_name: &str, name: &str) {
    let mut rest = name;
    if let Some(after) = rest.strip_prefix("Get") {
        out.push_str("get");
        rest = after.strip_prefix(type_name).unwrap_or(after);
    } else if let Some(after) = rest.strip_prefix("Destroy") {
        out.push_str("destroy");
        rest = if after == type_name { "" } else { after };
    } else {
        rest = rest.strip_prefix(type_name).unwrap_or(rest);
        let mut chars = rest.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_lowercase());
            rest = chars.as_str();
        }
    }
    if !type_name.is_empty() {
        if let Some(stripped) = rest.strip_suffix(type_name) {
            rest = stripped;
        }
    }
    out.push_str(rest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        let name = |type_name, raw| {
            let mut out = String::new();
            emit_fn_name(&mut out, type_name, raw);
            out
        };
        assert_eq!(name("Instance", "DestroyInstance"), "destroy");
        assert_eq!(name("Device", "DestroyPipelineCache"), "destroyPipelineCache");
        assert_eq!(name("Device", "GetDeviceQueue"), "getQueue");
        assert_eq!(name("Queue", "QueueSubmit"), "submit");
        assert_eq!(name("Device", "CreateBuffer"), "createBuffer");
        assert_eq!(name("", "EnumerateInstanceVersion"), "enumerateInstanceVersion");
        assert_eq!(name("CommandBuffer", "BeginCommandBuffer"), "begin");
    }

    #[test]
    fn accessor_stems() {
        let stem = |raw, is_ptr| {
            let mut out = String::new();
            member_name(&mut out, raw, is_ptr);
            out
        };
        assert_eq!(stem("width", false), "Width");
        assert_eq!(stem("pObjectName", true), "ObjectName");
        assert_eq!(stem("ppData", true), "Data");
        assert_eq!(stem("present", false), "Present");
        // A pointer whose name does not start with `p` is capitalized.
        assert_eq!(stem("next", true), "Next");
    }
}
