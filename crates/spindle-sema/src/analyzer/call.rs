// analyzer/call.rs
//! Calls, overload resolution, generic function manifestation and struct literals.

use spindle_frontend::{CallExpr, Span, StructLiteralExpr};

use super::{Analyzer, TypeError};
use crate::errors::SemanticError;
use crate::ids::FunctionId;
use crate::scope::{SymbolEntry, SymbolKind, TypeName};
use crate::structs::{Manifester, StructKind};
use crate::type_matcher::{first_unbound, match_many, match_one, substantiate, substantiate_all};
use crate::types::{FunctionSig, QualType, TypeMapping};

impl Analyzer<'_> {
    pub(super) fn check_call(&mut self, call: &CallExpr, span: Span) -> Result<QualType, TypeError> {
        let args = call
            .args
            .iter()
            .map(|a| self.check_expr(a))
            .collect::<Result<Vec<_>, _>>()?;
        let candidates = self.tree.lookup_functions(self.scope, &call.callee).to_vec();
        if candidates.is_empty() {
            return self.check_indirect_call(call, &args, span);
        }
        if args.iter().any(QualType::is_invalid) {
            return Ok(QualType::invalid());
        }
        let explicit = call
            .type_args
            .iter()
            .map(|t| self.resolve_type_expr(self.scope, t))
            .collect::<Result<Vec<_>, _>>()?;

        let mut matched: Vec<(FunctionId, TypeMapping)> = Vec::new();
        for id in candidates {
            if let Some(mapping) = self.match_candidate(id, &explicit, &args) {
                matched.push((id, mapping));
            }
        }
        let (id, mapping) = match matched.len() {
            0 => {
                self.add_error(
                    SemanticError::UndefinedFunction {
                        name: call.callee.clone(),
                        args: args.iter().map(QualType::name).collect::<Vec<_>>().join(", "),
                        span: span.into(),
                    },
                    span,
                );
                return Ok(QualType::invalid());
            }
            1 => matched.remove(0),
            count => {
                self.add_error(
                    SemanticError::FunctionAmbiguity {
                        name: call.callee.clone(),
                        count,
                        span: span.into(),
                    },
                    span,
                );
                return Ok(QualType::invalid());
            }
        };
        if let Some(symbol) = self.tree.peek(self.scope, &call.callee)
            && let Some(entry) = self.tree.entry_mut(symbol)
        {
            entry.used = true;
        }

        let template = self.functions.get(id).clone();
        if !template.is_generic() {
            return Ok(template.ret.unwrap_or_else(QualType::invalid));
        }
        if let Some(unbound) = first_unbound(&template.template_types, &mapping) {
            tracing::trace!(function = %template.name, generic = %unbound.name, "generic left unbound");
            self.add_error(
                SemanticError::GenericsNotInferred {
                    name: call.callee.clone(),
                    span: span.into(),
                },
                span,
            );
            return Ok(QualType::invalid());
        }

        let mut manifests = Manifester {
            structs: &mut self.structs,
            tree: &mut self.tree,
        };
        let substituted = substantiate_all(&template.param_types(), &mapping, &mut manifests).and_then(|params| {
            let ret = template
                .ret
                .as_ref()
                .map(|r| substantiate(r, &mapping, &mut manifests))
                .transpose()?;
            Ok(FunctionSig::new(params, ret))
        });
        let sig = match substituted {
            Ok(sig) => sig,
            Err(err) => {
                self.report_manifest_error(err, span)?;
                return Ok(QualType::invalid());
            }
        };
        let ret = sig.ret.as_deref().cloned();
        let (index, created) = self
            .functions
            .request_manifestation(&mut self.tree, id, mapping, sig);
        if created {
            self.queue_function(id, index);
        }
        Ok(ret.unwrap_or_else(QualType::invalid))
    }

    /// Mapping under which candidate `id` accepts `args`, if it does.
    fn match_candidate(&self, id: FunctionId, explicit: &[QualType], args: &[QualType]) -> Option<TypeMapping> {
        let template = self.functions.get(id);
        if template.params.len() != args.len() || explicit.len() > template.template_types.len() {
            return None;
        }
        let resolver = self.resolver(template.template_scope);
        let mut mapping = TypeMapping::default();
        for (generic, ty) in template.template_types.iter().zip(explicit) {
            if !generic.check_conditions_of(ty, false, &resolver) {
                return None;
            }
            mapping.insert(generic.name.clone(), ty.clone());
        }
        match_many(&template.param_types(), args, &mut mapping, &resolver, false).then_some(mapping)
    }

    /// Call through a variable of function type.
    fn check_indirect_call(&mut self, call: &CallExpr, args: &[QualType], span: Span) -> Result<QualType, TypeError> {
        let id = self.lookup_symbol(&call.callee, span)?;
        self.check_readable(id, span);
        let Some(callee) = self.tree.entry(id).map(|e| e.ty.clone()) else {
            return Ok(QualType::invalid());
        };
        if callee.is_invalid() || callee.is_dyn() {
            return Ok(QualType::invalid());
        }
        let Some(sig) = callee.function_sig() else {
            self.add_error(
                SemanticError::NotCallable {
                    name: call.callee.clone(),
                    found: callee.to_string(),
                    span: span.into(),
                },
                span,
            );
            return Ok(QualType::invalid());
        };
        if sig.params.len() != args.len() {
            self.add_error(
                SemanticError::WrongArgumentCount {
                    expected: sig.params.len(),
                    found: args.len(),
                    span: span.into(),
                },
                span,
            );
            return Ok(QualType::invalid());
        }
        for ((param, arg), expr) in sig.params.iter().zip(args).zip(&call.args) {
            if !self.is_assignable(param, arg) {
                self.type_mismatch(param, arg, expr.span);
            }
        }
        Ok(sig.ret.as_deref().cloned().unwrap_or_else(QualType::invalid))
    }

    /// Struct literal. Template arguments are explicit or inferred from the
    /// field values.
    pub(super) fn check_struct_literal(&mut self, literal: &StructLiteralExpr, span: Span) -> Result<QualType, TypeError> {
        let values = literal
            .fields
            .iter()
            .map(|f| self.check_expr(&f.value))
            .collect::<Result<Vec<_>, _>>()?;

        let (id, declared_in) = match self.tree.resolve_type_name(self.scope, &literal.name) {
            Some(TypeName::Struct { id, declared_in }) => (id, declared_in),
            Some(TypeName::Mapped(ty)) => {
                let found = ty.to_string();
                self.add_error(
                    SemanticError::NotAStruct {
                        found,
                        span: span.into(),
                    },
                    span,
                );
                return Ok(QualType::invalid());
            }
            Some(TypeName::Generic(_)) | None => {
                return Err(self.fail(
                    SemanticError::UnknownType {
                        name: literal.name.clone(),
                        span: span.into(),
                    },
                    span,
                ));
            }
        };
        let base = self.structs.get(id).clone();
        if base.kind == StructKind::Interface {
            self.add_error(
                SemanticError::NotAStruct {
                    found: base.name.clone(),
                    span: span.into(),
                },
                span,
            );
            return Ok(QualType::invalid());
        }

        let args = if base.template_types.is_empty() || !literal.type_args.is_empty() {
            literal
                .type_args
                .iter()
                .map(|t| self.resolve_type_expr(self.scope, t))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            // Infer from the field values
            let resolver = self.resolver(base.body);
            let mut mapping = TypeMapping::default();
            for (init, value) in literal.fields.iter().zip(&values) {
                if let Some(field) = base.field(&init.name)
                    && !match_one(&field.ty, value, &mut mapping, &resolver, false)
                {
                    tracing::trace!(field = %init.name, value = %value, "field value does not match template");
                }
            }
            if first_unbound(&base.template_types, &mapping).is_some() {
                self.add_error(
                    SemanticError::GenericsNotInferred {
                        name: literal.name.clone(),
                        span: span.into(),
                    },
                    span,
                );
                return Ok(QualType::invalid());
            }
            base.template_types
                .iter()
                .filter_map(|g| mapping.get(&g.name).cloned())
                .collect()
        };

        let ty = self.nominal_type(id, declared_in, args, span)?;
        let Some(body) = ty.nominal().and_then(|n| n.body) else {
            return Ok(ty);
        };

        for (init, value) in literal.fields.iter().zip(&values) {
            let expected = self
                .tree
                .lookup_strict(body, &init.name)
                .and_then(|f| self.tree.entry(f))
                .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
                .map(|e| e.ty.clone());
            match expected {
                Some(expected) => {
                    if !self.is_assignable(&expected, value) {
                        self.type_mismatch(&expected, value, init.span);
                    }
                }
                None => self.add_error(
                    SemanticError::UnknownField {
                        struct_name: ty.name(),
                        field: init.name.clone(),
                        span: init.span.into(),
                    },
                    init.span,
                ),
            }
        }
        let missing: Vec<String> = self
            .tree
            .scope(body)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
            .filter(|e| !literal.fields.iter().any(|f| f.name == e.name))
            .map(|e: &SymbolEntry| e.name.clone())
            .collect();
        for field in missing {
            self.add_error(
                SemanticError::MissingField {
                    struct_name: ty.name(),
                    field,
                    span: span.into(),
                },
                span,
            );
        }
        Ok(ty)
    }
}
