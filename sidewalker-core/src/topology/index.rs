use geo::Rect;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

type Envelope<K> = GeomWithData<Rectangle<[f64; 2]>, K>;

/// Bounding-box index over keyed geometries
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    tree: RTree<Envelope<K>>,
}

impl<K> Default for SpatialIndex<K> {
    fn default() -> Self {
        SpatialIndex { tree: RTree::new() }
    }
}

impl<K> SpatialIndex<K> {
    pub fn new(items: impl IntoIterator<Item = (K, Rect<f64>)>) -> Self {
        let envelopes = items
            .into_iter()
            .map(|(key, rect)| {
                let (min, max) = (rect.min(), rect.max());
                GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), key)
            })
            .collect();
        SpatialIndex {
            tree: RTree::bulk_load(envelopes),
        }
    }

    /// Keys whose bounding box intersects `rect`.
    pub fn query(&self, rect: Rect<f64>) -> impl Iterator<Item = &K> {
        let (min, max) = (rect.min(), rect.max());
        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| &item.data)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
