use crate::tree::{BinaryOp, Tree, TreeNode};

/// Canonical `(base register, constant offset)` form of an address tree.
///
/// Syntactically different address computations that land on the same
/// base and offset compare equal. Anything that does not reduce to that
/// shape is `Unresolved`, which never compares equal to any location,
/// itself included.
#[derive(Debug, Clone, Copy)]
pub enum MemLocation<'a> {
    Resolved { base: &'a TreeNode, offset: i64 },
    Unresolved,
}

impl<'a> MemLocation<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        match Self::extract(tree) {
            Some((base, offset)) => MemLocation::Resolved { base, offset },
            None => MemLocation::Unresolved,
        }
    }

    fn extract(tree: &'a TreeNode) -> Option<(&'a TreeNode, i64)> {
        match tree {
            TreeNode::PhysicalRegister { .. } => Some((tree, 0)),
            TreeNode::Binary {
                op: BinaryOp::Add,
                left,
                right,
            } => {
                if let Some(c) = right.as_constant() {
                    let (base, offset) = Self::extract(left)?;
                    Some((base, offset.wrapping_add(c)))
                } else if let Some(c) = left.as_constant() {
                    let (base, offset) = Self::extract(right)?;
                    Some((base, offset.wrapping_add(c)))
                } else {
                    None
                }
            }
            TreeNode::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            } => {
                let c = right.as_constant()?;
                let (base, offset) = Self::extract(left)?;
                Some((base, offset.wrapping_sub(c)))
            }
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, MemLocation::Resolved { .. })
    }

    pub fn base(&self) -> Option<&'a TreeNode> {
        match self {
            MemLocation::Resolved { base, .. } => Some(base),
            MemLocation::Unresolved => None,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        match self {
            MemLocation::Resolved { offset, .. } => Some(*offset),
            MemLocation::Unresolved => None,
        }
    }
}

impl PartialEq for MemLocation<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                MemLocation::Resolved { base, offset },
                MemLocation::Resolved {
                    base: other_base,
                    offset: other_offset,
                },
            ) => offset == other_offset && base == other_base,
            _ => false,
        }
    }
}

impl std::fmt::Display for MemLocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemLocation::Resolved { base, offset } => write!(f, "[{}, #{}]", base, offset),
            MemLocation::Unresolved => write!(f, "[unresolved]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::Register;

    fn reg(n: u8) -> Tree {
        TreeNode::register(Register::x(n), 8)
    }

    #[test]
    fn test_equality_is_reflexive_and_symmetric() {
        let a = TreeNode::add(reg(1), TreeNode::constant(8));
        let b = TreeNode::add(reg(1), TreeNode::constant(8));

        assert_eq!(MemLocation::new(&a), MemLocation::new(&a));
        assert_eq!(MemLocation::new(&a), MemLocation::new(&b));
        assert_eq!(MemLocation::new(&b), MemLocation::new(&a));
    }

    #[test]
    fn test_offsets_distinguish_locations() {
        let a = TreeNode::add(reg(1), TreeNode::constant(8));
        let b = TreeNode::add(reg(1), TreeNode::constant(16));
        let c = TreeNode::add(reg(2), TreeNode::constant(8));

        assert_ne!(MemLocation::new(&a), MemLocation::new(&b));
        assert_ne!(MemLocation::new(&a), MemLocation::new(&c));
    }

    #[test]
    fn test_equivalent_forms_canonicalize() {
        let plain = reg(1);
        let zero = TreeNode::add(reg(1), TreeNode::constant(0));
        assert_eq!(MemLocation::new(&plain), MemLocation::new(&zero));

        let nested = TreeNode::add(TreeNode::add(reg(1), TreeNode::constant(4)), TreeNode::constant(4));
        let flipped = TreeNode::add(TreeNode::constant(8), reg(1));
        let direct = TreeNode::add(reg(1), TreeNode::constant(8));
        assert_eq!(MemLocation::new(&nested), MemLocation::new(&direct));
        assert_eq!(MemLocation::new(&flipped), MemLocation::new(&direct));

        let sub = TreeNode::sub(reg(1), TreeNode::constant(8));
        assert_eq!(MemLocation::new(&sub).offset(), Some(-8));
    }

    #[test]
    fn test_unresolved_is_distinct_from_zero_offset() {
        let indexed = TreeNode::add(reg(1), reg(2));
        let location = MemLocation::new(&indexed);

        assert!(!location.is_resolved());
        assert_eq!(location.offset(), None);
        assert_ne!(location, MemLocation::new(&indexed));

        let zero = TreeNode::add(reg(1), TreeNode::constant(0));
        assert!(MemLocation::new(&zero).is_resolved());
        assert_eq!(MemLocation::new(&zero).offset(), Some(0));
    }
}
