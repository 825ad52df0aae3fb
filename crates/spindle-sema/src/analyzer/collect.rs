// analyzer/collect.rs
//! Declaration collection: structs, interfaces, functions and globals.
//!
//! Struct members are resolved in two steps. All templates are declared and
//! their member types resolved without manifesting anything; only then are
//! concrete member types manifested, so a field may name a template declared
//! further down the file.

use spindle_frontend::{Decl, FuncDecl, LetStmt, MethodSig, NodeId, Param, Span, TypeExpr, TypeParam};

use super::{Analyzer, TypeError};
use crate::errors::SemanticError;
use crate::functions::FunctionTemplate;
use crate::ids::{FunctionId, StructId};
use crate::scope::{ScopeId, ScopeKind, SymbolId, SymbolKind};
use crate::structs::{FieldDef, MethodDef, StructKind, StructTemplate, VTABLE_FIELD};
use crate::types::{FunctionSig, QualType};

impl Analyzer<'_> {
    pub(super) fn collect_declarations(&mut self) -> Result<(), TypeError> {
        let program = self.program;
        let mut declared = Vec::new();
        for (index, decl) in program.declarations.iter().enumerate() {
            let id = match decl {
                Decl::Struct(s) => {
                    self.declare_struct(index, &s.name, &s.type_params, StructKind::Struct, s.id, s.span)?
                }
                Decl::Interface(i) => {
                    self.declare_struct(index, &i.name, &i.type_params, StructKind::Interface, i.id, i.span)?
                }
                Decl::Function(_) | Decl::Global(_) => continue,
            };
            declared.push(id);
        }

        self.defer_manifestation = true;
        let filled = declared.iter().try_for_each(|&id| self.fill_members(id));
        self.defer_manifestation = false;
        filled?;
        for &id in &declared {
            self.seal_struct(id)?;
        }

        for (index, decl) in program.declarations.iter().enumerate() {
            match decl {
                Decl::Function(f) => self.declare_function(index, f)?,
                Decl::Global(l) => self.declare_global(l)?,
                Decl::Struct(_) | Decl::Interface(_) => {}
            }
        }
        Ok(())
    }

    /// Insert `name` into `scope`; a name taken in the same scope is fatal.
    pub(super) fn declare_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        ty: QualType,
        node: NodeId,
        span: Span,
    ) -> Result<SymbolId, TypeError> {
        self.tree.insert(scope, name, kind, ty, node, span).map_err(|_| {
            self.fail(
                SemanticError::DuplicateSymbol {
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            )
        })
    }

    fn declare_struct(
        &mut self,
        index: usize,
        name: &str,
        type_params: &[TypeParam],
        kind: StructKind,
        node: NodeId,
        span: Span,
    ) -> Result<StructId, TypeError> {
        let global = self.tree.global();
        let symbol = self.declare_symbol(global, name, SymbolKind::TypeName, QualType::invalid(), node, span)?;
        let scope_kind = match kind {
            StructKind::Struct => ScopeKind::Struct,
            StructKind::Interface => ScopeKind::Interface,
        };
        let body = self.tree.get_or_create_child(global, name, scope_kind, span);
        if !type_params.is_empty() {
            self.tree.mark_generic_template(body);
        }
        // Placeholders; conditions are resolved once every template is known
        let template_types = type_params
            .iter()
            .map(|p| crate::types::GenericType::new(p.name.as_str()))
            .collect::<Vec<_>>();
        for generic in &template_types {
            self.tree.insert_generic_type(body, generic.clone());
        }
        let id = self.structs.declare(StructTemplate {
            name: name.to_string(),
            kind,
            template_types,
            declared_in: global,
            body,
            decl_node: node,
            decl_span: span,
            decl_index: index,
        });
        self.tree.register_struct(global, name, id);
        let ty = self.structs.get(id).as_type();
        if let Some(entry) = self.tree.entry_mut(symbol) {
            entry.update_type(ty, true);
        }
        tracing::trace!(name, ?kind, "template declared");
        Ok(id)
    }

    fn fill_members(&mut self, id: StructId) -> Result<(), TypeError> {
        let program = self.program;
        let (declared_in, body, decl_index) = {
            let base = self.structs.get(id);
            (base.declared_in, base.body, base.decl_index)
        };
        let (template_types, fields, methods, interfaces) = match &program.declarations[decl_index] {
            Decl::Struct(decl) => {
                let generics = self.declare_type_params(declared_in, body, &decl.type_params)?;
                let interfaces = self.resolve_interfaces(body, &decl.implements)?;
                let mut fields = Vec::with_capacity(decl.fields.len() + 1);
                if !interfaces.is_empty() {
                    fields.push(FieldDef {
                        name: VTABLE_FIELD.to_string(),
                        ty: QualType::byte().to_ptr(),
                        span: decl.span,
                        implicit: true,
                    });
                }
                for field in &decl.fields {
                    fields.push(FieldDef {
                        name: field.name.clone(),
                        ty: self.resolve_type_expr(body, &field.ty)?,
                        span: field.span,
                        implicit: false,
                    });
                }
                let mut methods = Vec::with_capacity(decl.methods.len());
                for (index, method) in decl.methods.iter().enumerate() {
                    let sig = self.resolve_sig(body, &method.params, method.return_type.as_ref())?;
                    methods.push(MethodDef {
                        name: method.name.clone(),
                        sig,
                        span: method.span,
                        decl_index: Some(index),
                    });
                }
                (generics, fields, methods, interfaces)
            }
            Decl::Interface(decl) => {
                let generics = self.declare_type_params(declared_in, body, &decl.type_params)?;
                let methods = decl
                    .methods
                    .iter()
                    .map(|m: &MethodSig| {
                        Ok(MethodDef {
                            name: m.name.clone(),
                            sig: self.resolve_sig(body, &m.params, m.return_type.as_ref())?,
                            span: m.span,
                            decl_index: None,
                        })
                    })
                    .collect::<Result<Vec<_>, TypeError>>()?;
                (generics, Vec::new(), methods, Vec::new())
            }
            Decl::Function(_) | Decl::Global(_) => return Ok(()),
        };

        let base = self.structs.get_mut(id);
        base.template_types = template_types;
        base.fields = fields;
        base.methods = methods;
        base.interfaces = interfaces;
        Ok(())
    }

    fn resolve_interfaces(&mut self, scope: ScopeId, implements: &[TypeExpr]) -> Result<Vec<QualType>, TypeError> {
        let mut interfaces = Vec::with_capacity(implements.len());
        for texpr in implements {
            let ty = self.resolve_type_expr(scope, texpr)?;
            if ty.is_interface() {
                interfaces.push(ty);
            } else if !ty.is_invalid() {
                self.add_error(
                    SemanticError::NotAnInterface {
                        name: ty.to_string(),
                        span: texpr.span.into(),
                    },
                    texpr.span,
                );
            }
        }
        Ok(interfaces)
    }

    fn resolve_sig(
        &mut self,
        scope: ScopeId,
        params: &[Param],
        ret: Option<&TypeExpr>,
    ) -> Result<FunctionSig, TypeError> {
        let params = params
            .iter()
            .map(|p| self.resolve_type_expr(scope, &p.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = ret.map(|r| self.resolve_type_expr(scope, r)).transpose()?;
        Ok(FunctionSig::new(params, ret))
    }

    /// Manifest the concrete member types, then populate the body scope.
    fn seal_struct(&mut self, id: StructId) -> Result<(), TypeError> {
        let mut base = self.structs.get(id).clone();
        for field in &mut base.fields {
            field.ty = self.manifest_concrete(&field.ty, field.span)?;
        }
        for method in &mut base.methods {
            for param in &mut method.sig.params {
                *param = self.manifest_concrete(param, method.span)?;
            }
            if let Some(ret) = &mut method.sig.ret {
                **ret = self.manifest_concrete(ret, method.span)?;
            }
        }
        for interface in &mut base.interfaces {
            *interface = self.manifest_concrete(interface, base.decl_span)?;
        }
        let span = base.decl_span;
        let stored = self.structs.get_mut(id);
        stored.fields = base.fields;
        stored.methods = base.methods;
        stored.interfaces = base.interfaces;
        match self.structs.seal(&mut self.tree, id) {
            Ok(()) => Ok(()),
            Err(err) => self.report_manifest_error(err, span),
        }
    }

    fn declare_function(&mut self, index: usize, decl: &FuncDecl) -> Result<(), TypeError> {
        let global = self.tree.global();
        let scope_name = format!("fn:{}@{}", decl.name, decl.span);
        let template_scope = self
            .tree
            .get_or_create_child(global, &scope_name, ScopeKind::FunctionBody, decl.span);
        if !decl.type_params.is_empty() {
            self.tree.mark_generic_template(template_scope);
        }
        let template_types = self.declare_type_params(global, template_scope, &decl.type_params)?;
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            params.push((param.name.clone(), self.resolve_type_expr(template_scope, &param.ty)?));
        }
        let ret = decl
            .return_type
            .as_ref()
            .map(|r| self.resolve_type_expr(template_scope, r))
            .transpose()?;

        let id = self.functions.declare(FunctionTemplate {
            id: FunctionId::new(0),
            name: decl.name.clone(),
            template_types,
            params,
            ret,
            declared_in: global,
            template_scope,
            decl_index: index,
            span: decl.span,
        });

        // Overloads share one symbol
        match self.tree.lookup_strict(global, &decl.name).and_then(|s| self.tree.entry(s)) {
            Some(existing) if existing.kind == SymbolKind::Function => {}
            Some(_) => {
                return Err(self.fail(
                    SemanticError::DuplicateSymbol {
                        name: decl.name.clone(),
                        span: decl.span.into(),
                    },
                    decl.span,
                ));
            }
            None => {
                let ty = self.functions.get(id).as_type();
                self.declare_symbol(global, &decl.name, SymbolKind::Function, ty, decl.id, decl.span)?;
            }
        }
        self.tree.register_function(global, &decl.name, id);
        tracing::trace!(name = %decl.name, generic = !decl.type_params.is_empty(), "function declared");
        Ok(())
    }

    fn declare_global(&mut self, decl: &LetStmt) -> Result<(), TypeError> {
        let global = self.tree.global();
        let ty = match &decl.ty {
            Some(texpr) => self.resolve_type_expr(global, texpr)?,
            None => QualType::dyn_type(),
        };
        self.declare_symbol(global, &decl.name, SymbolKind::Variable, ty, decl.id, decl.span)?;
        Ok(())
    }
}
