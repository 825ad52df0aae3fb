// analyzer/lambda.rs
//! Lambda expressions and their captures.

use spindle_frontend::{LambdaExpr, LambdaKind, NodeId, Span};

use super::{Analyzer, FunctionContext, LambdaAnalysis, TypeError};
use crate::scope::{ScopeKind, SymbolKind};
use crate::types::QualType;

impl Analyzer<'_> {
    pub(super) fn check_lambda(&mut self, node: NodeId, lambda: &LambdaExpr, span: Span) -> Result<QualType, TypeError> {
        let kind = match lambda.kind {
            LambdaKind::Closure => ScopeKind::Closure,
            LambdaKind::Thread => ScopeKind::Thread,
        };
        let params = lambda
            .params
            .iter()
            .map(|p| self.resolve_type_expr(self.scope, &p.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = match &lambda.return_type {
            Some(texpr) => Some(self.resolve_type_expr(self.scope, texpr)?),
            None => None,
        };

        let name = format!("lambda#{}", node.index());
        let scope = self.tree.get_or_create_child(self.scope, &name, kind, span);
        self.tree.set_capturing(scope, lambda.kind);
        let saved = std::mem::replace(&mut self.scope, scope);
        for (param, ty) in lambda.params.iter().zip(&params) {
            let id = self.declare_symbol(scope, &param.name, SymbolKind::Variable, ty.clone(), param.id, param.span)?;
            self.bind_param(id, param.id, param.span, false)?;
        }
        self.function_stack.push(FunctionContext { ret: ret.clone() });
        let checked = self.check_stmts(&lambda.body.stmts);
        self.function_stack.pop();
        checked?;
        self.end_scope(scope, lambda.body.id, lambda.body.span)?;
        self.scope = saved;

        self.tree.refresh_capture_modes(scope);
        let captures = self.tree.captures(scope).to_vec();
        tracing::debug!(
            lambda = node.index(),
            ?kind,
            captures = captures.len(),
            "lambda checked"
        );
        let ty = QualType::function(params, ret);
        self.lambdas.insert(
            node,
            LambdaAnalysis {
                kind: lambda.kind,
                scope,
                captures,
                ty: ty.clone(),
            },
        );
        Ok(ty)
    }
}
