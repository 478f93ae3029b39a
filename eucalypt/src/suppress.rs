//! Move suppression.
//!
//! Some moves only reflect a symmetric rewrite: the branches of a conditional
//! trading places, or the operands of an order-insensitive expression trading
//! slots. A reader does not perceive those as moves. The passes here remove
//! such Move actions and emit a [`Action::Rematch`] for each, so the pair stays
//! cross-referenced without being shown.

use indextree::NodeId;

use crate::mapping::MappingStore;
use crate::script::{Action, EditScript};
use crate::tree::{KindClass, RoleClass, Tree, TreeTypes};
use crate::{debug, trace};

/// How the ancestor path of a moved node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    /// Through nested conditionals, for alternative branches.
    Branch,
    /// Through ancestors sitting in the same kind of slot.
    Sibling,
}

fn chain_for<T: TreeTypes>(src: &Tree<T>, dst: &Tree<T>, s: NodeId, d: NodeId) -> Option<Chain> {
    src.role(s)?;
    let src_class = src.role_class(s);
    if src_class.contains(RoleClass::ALTERNATIVE)
        || dst.role_class(d).contains(RoleClass::ALTERNATIVE)
    {
        Some(Chain::Branch)
    } else if src_class.is_order_insensitive() {
        Some(Chain::Sibling)
    } else {
        None
    }
}

/// The node, the ancestors continuing the chain, and the first ancestor that
/// breaks it, innermost first. `None` when the chain runs past the root.
fn chain_path<T: TreeTypes>(tree: &Tree<T>, node: NodeId, chain: Chain) -> Option<Vec<NodeId>> {
    let mut path = vec![node];
    match chain {
        Chain::Branch => {
            let mut cursor = tree.parent(node);
            while let Some(p) = cursor
                && tree.kind_class(p).contains(KindClass::CONDITIONAL)
            {
                path.push(p);
                cursor = tree.parent(p);
            }
            path.push(cursor?);
        }
        Chain::Sibling => {
            let slot = tree.role_class(node).slot();
            let mut current = node;
            while tree.role_class(current).slot() == slot {
                current = tree.parent(current)?;
                path.push(current);
            }
        }
    }
    Some(path)
}

/// Walk the two paths from the outside in and check that every comparable
/// ancestor leads to the moved node through the same role on both sides.
fn paths_agree<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    src_path: &[NodeId],
    dst_path: &[NodeId],
    chain: Chain,
) -> bool {
    for k in (1..src_path.len()).rev() {
        let ancestor = src_path[k];
        // Unmapped ancestors, or ancestors mapped off the path, are deleted or
        // inserted independently.
        let Some(image) = mapping.get_dst(ancestor) else {
            continue;
        };
        let Some(pos) = dst_path.iter().position(|&n| n == image) else {
            continue;
        };
        if pos == 0 {
            continue;
        }

        let inner_src = src_path[k - 1];
        let inner_dst = dst_path[pos - 1];
        let class = src.kind_class(ancestor);
        if class.contains(KindClass::COMMUTATIVE) {
            continue;
        }
        if chain == Chain::Branch
            && class.contains(KindClass::CONDITIONAL)
            && src.role_class(inner_src).contains(RoleClass::BRANCH)
            && dst.role_class(inner_dst).contains(RoleClass::BRANCH)
        {
            continue;
        }
        if src.role(inner_src) != dst.role(inner_dst) {
            trace!(
                ancestor = usize::from(ancestor),
                inner = usize::from(inner_src),
                "suppress: role mismatch"
            );
            return false;
        }
    }
    true
}

/// Whether the move of `s` onto `d` is a symmetric repositioning.
fn is_symmetric_move<T: TreeTypes>(
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
    s: NodeId,
    d: NodeId,
) -> bool {
    let Some(chain) = chain_for(src, dst, s, d) else {
        return false;
    };
    let (Some(src_path), Some(dst_path)) = (chain_path(src, s, chain), chain_path(dst, d, chain))
    else {
        return false;
    };
    let (Some(&src_top), Some(&dst_top)) = (src_path.last(), dst_path.last()) else {
        return false;
    };
    if !mapping.has(src_top, dst_top) {
        return false;
    }
    paths_agree(src, dst, mapping, &src_path, &dst_path, chain)
}

/// Remove moves judged symmetric by role class and ancestor paths.
///
/// The removed moves are taken out in one batch. Each then becomes a Rematch,
/// or an Update if the pair was relabeled, unless its node lies inside another
/// move that survived. Returns the number of moves removed.
pub fn suppress_symmetric_moves<T: TreeTypes>(
    script: &mut EditScript,
    src: &Tree<T>,
    dst: &Tree<T>,
    mapping: &MappingStore,
) -> usize {
    let removed: Vec<Action> = script
        .moves()
        .filter(|action| match **action {
            Action::Move { src: s, dst: d, .. } => is_symmetric_move(src, dst, mapping, s, d),
            _ => false,
        })
        .copied()
        .collect();

    replace_moves(script, src, &removed);
    debug!(removed = removed.len(), "symmetric move suppression done");
    removed.len()
}

/// Remove moves whose source node was re-paired with the same partner by
/// token recovery. Returns the number of moves removed.
pub fn suppress_overlay_moves<T: TreeTypes>(
    script: &mut EditScript,
    src: &Tree<T>,
    overlay: &MappingStore,
) -> usize {
    let removed: Vec<Action> = script
        .moves()
        .filter(|action| match **action {
            Action::Move { src: s, dst: d, .. } => overlay.has(s, d),
            _ => false,
        })
        .copied()
        .collect();

    replace_moves(script, src, &removed);
    debug!(removed = removed.len(), "overlay move suppression done");
    removed.len()
}

fn replace_moves<T: TreeTypes>(script: &mut EditScript, src: &Tree<T>, removed: &[Action]) {
    if removed.is_empty() {
        return;
    }
    script.retain(|action| !removed.contains(action));

    let surviving: Vec<NodeId> = script.moves().filter_map(Action::src).collect();
    for action in removed {
        let Action::Move {
            src: s,
            dst: d,
            relabeled,
            ..
        } = *action
        else {
            continue;
        };
        if relabeled {
            trace!(src = usize::from(s), dst = usize::from(d), "suppress: move becomes update");
            script.push(Action::Update { src: s, dst: d });
        } else if surviving.iter().any(|&m| src.is_descendant(s, m)) {
            trace!(src = usize::from(s), "suppress: inside a surviving move");
        } else {
            trace!(src = usize::from(s), dst = usize::from(d), "suppress: rematch");
            script.push(Action::Rematch { src: s, dst: d });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JavaTypes;
    use crate::script::generate_edit_script;
    use crate::tree::{NodeData, TreeBuilder};

    type Data = NodeData<JavaTypes>;

    /// Block -> IfStatement(cond, then -> ExpressionStatement(first),
    /// else -> ExpressionStatement(second))
    fn conditional(cond: &str, first: &str, second: &str) -> (Tree<JavaTypes>, [NodeId; 3]) {
        let mut builder = TreeBuilder::<JavaTypes>::new(Data::new("Block"));
        let root = builder.root();
        let if_stmt = builder.add_child(root, Data::new("IfStatement").with_role("statements"));
        builder.add_child(if_stmt, Data::leaf("SimpleName", cond).with_role("expression"));
        let then_branch = builder.add_child(
            if_stmt,
            Data::new("ExpressionStatement").with_role("thenStatement"),
        );
        builder.add_child(then_branch, Data::leaf("SimpleName", first).with_role("expression"));
        let else_branch = builder.add_child(
            if_stmt,
            Data::new("ExpressionStatement").with_role("elseStatement"),
        );
        builder.add_child(else_branch, Data::leaf("SimpleName", second).with_role("expression"));
        (builder.build().unwrap(), [if_stmt, then_branch, else_branch])
    }

    fn map_all(
        src: &Tree<JavaTypes>,
        dst: &Tree<JavaTypes>,
        pairs: &[(NodeId, NodeId)],
    ) -> MappingStore {
        let mut mapping = MappingStore::for_trees(src, dst);
        mapping.add(src.root(), dst.root());
        for &(s, d) in pairs {
            mapping.add_recursively(src, dst, s, d);
        }
        mapping
    }

    #[test]
    fn test_branch_swap_becomes_rematch() {
        let (src, [s_if, s_then, s_else]) = conditional("c", "a", "b");
        let (dst, [d_if, d_then, d_else]) = conditional("d", "b", "a");
        let mut mapping = map_all(&src, &dst, &[(s_then, d_else), (s_else, d_then)]);
        mapping.add(s_if, d_if);
        mapping.add(src.children(s_if).next().unwrap(), dst.children(d_if).next().unwrap());

        let mut script = generate_edit_script(&src, &dst, &mapping);
        assert_eq!(script.moves().count(), 1);
        assert!(script.move_for(s_then).is_some());

        let removed = suppress_symmetric_moves(&mut script, &src, &dst, &mapping);

        assert_eq!(removed, 1);
        assert_eq!(script.moves().count(), 0);
        let rematches: Vec<_> = script
            .iter()
            .filter(|a| matches!(a, Action::Rematch { .. }))
            .collect();
        assert_eq!(
            rematches,
            [&Action::Rematch {
                src: s_then,
                dst: d_else
            }]
        );
    }

    #[test]
    fn test_statement_reorder_is_kept() {
        let build = |first: &str, second: &str| {
            let mut builder = TreeBuilder::<JavaTypes>::new(Data::new("Block"));
            let root = builder.root();
            let mut ids = Vec::new();
            for label in [first, second] {
                let stmt = builder.add_child(
                    root,
                    Data::new("ExpressionStatement").with_role("statements"),
                );
                builder.add_child(stmt, Data::leaf("SimpleName", label).with_role("expression"));
                ids.push(stmt);
            }
            (builder.build().unwrap(), ids)
        };
        let (src, s) = build("x", "y");
        let (dst, d) = build("y", "x");
        let mapping = map_all(&src, &dst, &[(s[0], d[1]), (s[1], d[0])]);

        let mut script = generate_edit_script(&src, &dst, &mapping);
        let removed = suppress_symmetric_moves(&mut script, &src, &dst, &mapping);

        assert_eq!(removed, 0);
        assert_eq!(script.moves().count(), 1);
        assert!(script.move_for(s[0]).is_some());
    }

    #[test]
    fn test_commutative_operands_and_idempotence() {
        let build = |left: &str, right: &str| {
            let mut builder = TreeBuilder::<JavaTypes>::new(Data::new("ExpressionStatement"));
            let root = builder.root();
            let infix = builder.add_child(
                root,
                Data::leaf("InfixExpression", "+").with_role("expression"),
            );
            let l = builder.add_child(
                infix,
                Data::leaf("SimpleName", left).with_role("leftOperand"),
            );
            let r = builder.add_child(
                infix,
                Data::leaf("SimpleName", right).with_role("rightOperand"),
            );
            (builder.build().unwrap(), infix, [l, r])
        };
        let (src, s_infix, [s_l, s_r]) = build("a", "b");
        let (dst, d_infix, [d_l, d_r]) = build("b", "a");
        let mut mapping = map_all(&src, &dst, &[(s_l, d_r), (s_r, d_l)]);
        mapping.add(s_infix, d_infix);

        let mut script = generate_edit_script(&src, &dst, &mapping);
        assert_eq!(suppress_symmetric_moves(&mut script, &src, &dst, &mapping), 1);
        assert_eq!(script.moves().count(), 0);

        let once = script.clone();
        assert_eq!(suppress_symmetric_moves(&mut script, &src, &dst, &mapping), 0);
        assert_eq!(script, once);
    }

    #[test]
    fn test_overlay_suppression_skips_nodes_inside_surviving_moves() {
        let (src, [s_if, s_then, _]) = conditional("c", "a", "b");
        let (dst, [d_if, _, d_else]) = conditional("c", "b", "a");
        let s_leaf = src.children(s_then).next().unwrap();
        let d_leaf = dst.children(d_else).next().unwrap();

        let mut script = EditScript::new();
        script.push(Action::Move {
            src: s_then,
            dst: d_else,
            parent: d_if,
            position: 2,
            relabeled: false,
        });
        script.push(Action::Move {
            src: s_leaf,
            dst: d_leaf,
            parent: d_else,
            position: 0,
            relabeled: false,
        });
        let mut overlay = MappingStore::for_trees(&src, &dst);
        overlay.add(s_if, d_if);
        overlay.add(s_leaf, d_leaf);

        assert_eq!(suppress_overlay_moves(&mut script, &src, &overlay), 1);
        assert_eq!(script.moves().count(), 1);
        assert!(script.iter().all(|a| a.is_visible()), "leaf lies inside the surviving move");
    }

    #[test]
    fn test_relabeled_move_becomes_update() {
        let (src, [_, s_then, _]) = conditional("c", "a", "b");
        let (dst, [d_if, _, d_else]) = conditional("c", "b", "a");

        let mut script = EditScript::new();
        script.push(Action::Move {
            src: s_then,
            dst: d_else,
            parent: d_if,
            position: 2,
            relabeled: true,
        });
        let mut overlay = MappingStore::for_trees(&src, &dst);
        overlay.add(s_then, d_else);

        assert_eq!(suppress_overlay_moves(&mut script, &src, &overlay), 1);
        assert_eq!(script.actions(), &[Action::Update { src: s_then, dst: d_else }]);
    }
}
