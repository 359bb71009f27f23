use crate::NodeId;
use crate::model::SidewalkId;

/// Sidewalks already built along one edge, keyed by the edge id shared by
/// both of its traversals.
///
/// Sides are relative to the traversal from `origin`; walking the edge from
/// the other end swaps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionMemo {
    pub origin: NodeId,
    pub left: Option<SidewalkId>,
    pub right: Option<SidewalkId>,
}

/// Sidewalk seen from one end of its edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stub {
    pub id: SidewalkId,
    /// Set when the geometry runs towards the node, so its near end is the last coordinate
    pub reversed: bool,
}

/// Left and right stub of one edge traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubPair {
    pub left: Option<Stub>,
    pub right: Option<Stub>,
}

impl ConnectionMemo {
    /// Stubs of this edge as seen when leaving `node`.
    pub fn resolve(&self, node: NodeId) -> StubPair {
        if node == self.origin {
            StubPair {
                left: self.left.map(|id| Stub {
                    id,
                    reversed: false,
                }),
                right: self.right.map(|id| Stub {
                    id,
                    reversed: false,
                }),
            }
        } else {
            StubPair {
                left: self.right.map(|id| Stub { id, reversed: true }),
                right: self.left.map(|id| Stub { id, reversed: true }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Side;

    #[test]
    fn test_resolve_swaps_sides_from_far_end() {
        let left = SidewalkId::new(1, 2, Side::Left);
        let memo = ConnectionMemo {
            origin: 1,
            left: Some(left),
            right: None,
        };

        let near = memo.resolve(1);
        assert_eq!(
            near.left,
            Some(Stub {
                id: left,
                reversed: false
            })
        );
        assert_eq!(near.right, None);

        let far = memo.resolve(2);
        assert_eq!(far.left, None);
        assert_eq!(
            far.right,
            Some(Stub {
                id: left,
                reversed: true
            })
        );
    }
}
