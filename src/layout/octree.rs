//! Barnes-Hut octree for approximate many-body repulsion
//!
//! The tree is rebuilt from scratch every step; there is no incremental
//! update path. Octants live in a flat arena and refer to their children by
//! index.
//!
//! # Approximation error
//!
//! A region is collapsed into a pseudo-body at its centre of mass only when
//! the query point lies outside the region and `size / distance < theta`.
//! Expanding about the centre of mass cancels the dipole term, so the error
//! of each accepted region is bounded by the quadrupole term: relative to
//! the exact contribution it is at most `C * theta^2` with `C ≈ 3` for the
//! inverse-square law. `theta = 0` never accepts a region and reproduces
//! the all-pairs sum exactly (up to summation order).

use glam::Vec3;

use super::forces::repulsion_between;

/// Depth at which octants stop splitting and keep a bucket of bodies.
///
/// Only reached by (near-)coincident nodes; 24 halvings of any sane layout
/// extent is below f32 resolution.
pub const MAX_DEPTH: usize = 24;

/// A point mass inserted into the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub mass: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum Contents {
    Empty,
    Body(usize),
    /// Coincident bodies at `MAX_DEPTH`
    Bucket(Vec<usize>),
    Split([Option<usize>; 8]),
}

/// An axis-aligned cubic region of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Octant {
    pub center: Vec3,
    pub half_size: f32,
    /// Aggregate mass of all contained bodies
    pub mass: f32,
    /// Mass-weighted centroid of all contained bodies
    pub centroid: Vec3,
    contents: Contents,
}

impl Octant {
    fn new(center: Vec3, half_size: f32) -> Self {
        Self {
            center,
            half_size,
            mass: 0.0,
            centroid: Vec3::ZERO,
            contents: Contents::Empty,
        }
    }

    /// Edge length of the cube
    pub fn size(&self) -> f32 {
        self.half_size * 2.0
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let d = (point - self.center).abs();
        d.max_element() <= self.half_size
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self.contents, Contents::Split(_))
    }

    /// Index (0-7) of the child octant a point falls into
    fn octant_of(&self, point: Vec3) -> usize {
        let mut index = 0;
        if point.x >= self.center.x {
            index |= 1;
        }
        if point.y >= self.center.y {
            index |= 2;
        }
        if point.z >= self.center.z {
            index |= 4;
        }
        index
    }

    fn child_center(&self, octant: usize) -> Vec3 {
        let quarter = self.half_size * 0.5;
        let sign = |bit: usize| if octant & bit != 0 { quarter } else { -quarter };
        self.center + Vec3::new(sign(1), sign(2), sign(4))
    }

    fn accumulate(&mut self, body: &Body) {
        self.mass += body.mass;
        // Running weighted sum; normalized once the build completes
        self.centroid += body.position * body.mass;
    }
}

/// Spatial partition over the current node positions
#[derive(Debug, Clone)]
pub struct Octree {
    octants: Vec<Octant>,
    bodies: Vec<Body>,
}

impl Octree {
    /// Build a tree over `bodies`.
    ///
    /// Returns `None` for fewer than two bodies, where there is no
    /// repulsion to compute.
    pub fn build(bodies: Vec<Body>) -> Option<Self> {
        if bodies.len() < 2 {
            return None;
        }

        let (min, max) = bodies.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), b| (min.min(b.position), max.max(b.position)),
        );
        let center = (min + max) * 0.5;
        let extent = (max - min).max_element();
        // Pad so bodies on the boundary stay strictly inside
        let half_size = if extent > 0.0 { extent * 0.5 * 1.001 } else { 1.0 };

        let mut tree = Self {
            octants: Vec::with_capacity(bodies.len() * 2),
            bodies,
        };
        tree.octants.push(Octant::new(center, half_size));

        for index in 0..tree.bodies.len() {
            tree.insert(index);
        }

        for octant in &mut tree.octants {
            if octant.mass > 0.0 {
                octant.centroid /= octant.mass;
            }
        }

        Some(tree)
    }

    fn insert(&mut self, body: usize) {
        let item = self.bodies[body];
        let mut at = 0;
        let mut depth = 0;

        loop {
            self.octants[at].accumulate(&item);

            match std::mem::replace(&mut self.octants[at].contents, Contents::Empty) {
                Contents::Empty => {
                    self.octants[at].contents = Contents::Body(body);
                    return;
                }
                Contents::Bucket(mut members) => {
                    members.push(body);
                    self.octants[at].contents = Contents::Bucket(members);
                    return;
                }
                Contents::Body(other) if depth >= MAX_DEPTH => {
                    self.octants[at].contents = Contents::Bucket(vec![other, body]);
                    return;
                }
                Contents::Body(other) => {
                    // Push the resident body down one level, then keep
                    // descending with the new one
                    let resident = self.bodies[other];
                    let slot = self.octants[at].octant_of(resident.position);
                    let child = self.push_child(at, slot);
                    self.octants[child].accumulate(&resident);
                    self.octants[child].contents = Contents::Body(other);

                    let mut children = [None; 8];
                    children[slot] = Some(child);
                    self.octants[at].contents = Contents::Split(children);
                    at = self.descend(at, item.position);
                }
                Contents::Split(children) => {
                    self.octants[at].contents = Contents::Split(children);
                    at = self.descend(at, item.position);
                }
            }
            depth += 1;
        }
    }

    /// Child of a split octant containing `point`, created on demand
    fn descend(&mut self, at: usize, point: Vec3) -> usize {
        let slot = self.octants[at].octant_of(point);
        if let Contents::Split(children) = &self.octants[at].contents {
            if let Some(child) = children[slot] {
                return child;
            }
        }
        let child = self.push_child(at, slot);
        if let Contents::Split(children) = &mut self.octants[at].contents {
            children[slot] = Some(child);
        }
        child
    }

    fn push_child(&mut self, parent: usize, slot: usize) -> usize {
        let p = &self.octants[parent];
        let octant = Octant::new(p.child_center(slot), p.half_size * 0.5);
        self.octants.push(octant);
        self.octants.len() - 1
    }

    pub fn root(&self) -> &Octant {
        &self.octants[0]
    }

    pub fn octant_count(&self) -> usize {
        self.octants.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Inverse-square repulsion field acting on body `index`.
    ///
    /// The result is `sum(m_j * dir_j / d_j^2)`; the caller scales it by the
    /// repulsion strength and the body's own mass.
    pub fn repulsion_on(&self, index: usize, theta: f32) -> Vec3 {
        let position = self.bodies[index].position;
        let mut field = Vec3::ZERO;
        let mut stack = vec![0usize];

        while let Some(at) = stack.pop() {
            let octant = &self.octants[at];
            if octant.mass <= 0.0 {
                continue;
            }

            match &octant.contents {
                Contents::Empty => {}
                Contents::Body(other) => {
                    field += self.exact(index, *other);
                }
                Contents::Bucket(members) => {
                    for &other in members {
                        field += self.exact(index, other);
                    }
                }
                Contents::Split(children) => {
                    let distance = octant.centroid.distance(position);
                    if !octant.contains(position) && octant.size() < theta * distance {
                        field += repulsion_between(
                            position,
                            octant.centroid,
                            octant.mass,
                            index,
                            usize::MAX,
                        );
                    } else {
                        stack.extend(children.iter().flatten());
                    }
                }
            }
        }

        field
    }

    fn exact(&self, index: usize, other: usize) -> Vec3 {
        if index == other {
            return Vec3::ZERO;
        }
        let source = self.bodies[other];
        repulsion_between(
            self.bodies[index].position,
            source.position,
            source.mass,
            index,
            other,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_body(x: f32, y: f32, z: f32) -> Body {
        Body {
            position: Vec3::new(x, y, z),
            mass: 1.0,
        }
    }

    #[test]
    fn fewer_than_two_bodies_builds_nothing() {
        assert!(Octree::build(vec![]).is_none());
        assert!(Octree::build(vec![unit_body(1.0, 2.0, 3.0)]).is_none());
    }

    #[test]
    fn root_aggregates_mass_and_centroid() {
        let bodies = vec![
            Body {
                position: Vec3::new(0.0, 0.0, 0.0),
                mass: 1.0,
            },
            Body {
                position: Vec3::new(4.0, 0.0, 0.0),
                mass: 3.0,
            },
        ];
        let tree = Octree::build(bodies).unwrap();

        assert_eq!(tree.root().mass, 4.0);
        assert!((tree.root().centroid - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
        assert!(!tree.root().is_leaf());
    }

    #[test]
    fn every_body_lands_in_the_root_cube() {
        let bodies: Vec<Body> = (0..50)
            .map(|i| {
                let t = i as f32;
                unit_body(t.sin() * 20.0, t.cos() * 5.0, t * 0.3)
            })
            .collect();
        let tree = Octree::build(bodies.clone()).unwrap();

        for b in &bodies {
            assert!(tree.root().contains(b.position));
        }
        assert_eq!(tree.root().mass, 50.0);
    }

    #[test]
    fn coincident_bodies_terminate_in_a_bucket() {
        let bodies = vec![unit_body(1.0, 1.0, 1.0); 3];
        let tree = Octree::build(bodies).unwrap();

        assert_eq!(tree.root().mass, 3.0);
        // One chain of octants down to MAX_DEPTH, not unbounded splitting
        assert!(tree.octant_count() <= MAX_DEPTH + 2);

        let field = tree.repulsion_on(0, 0.8);
        assert!(field.is_finite());
        assert!(field.length() > 0.0);
    }

    #[test]
    fn zero_theta_matches_direct_sum() {
        let bodies: Vec<Body> = (0..40)
            .map(|i| {
                let t = i as f32 * 0.7;
                unit_body(t.cos() * 10.0, t.sin() * 10.0, (t * 1.3).sin() * 10.0)
            })
            .collect();
        let tree = Octree::build(bodies.clone()).unwrap();

        for i in 0..bodies.len() {
            let direct: Vec3 = (0..bodies.len())
                .filter(|&j| j != i)
                .map(|j| repulsion_between(bodies[i].position, bodies[j].position, 1.0, i, j))
                .sum();
            let approx = tree.repulsion_on(i, 0.0);
            assert!((direct - approx).length() <= direct.length() * 1e-4 + 1e-6);
        }
    }

    #[test]
    fn distant_cluster_is_collapsed() {
        // Tight cluster far from a probe body
        let mut bodies = vec![unit_body(0.0, 0.0, 0.0)];
        for i in 0..8 {
            let t = i as f32;
            bodies.push(unit_body(100.0 + t * 0.01, t * 0.01, 0.0));
        }
        let tree = Octree::build(bodies).unwrap();

        let field = tree.repulsion_on(0, 0.8);
        // Points away from the cluster, magnitude ~ 8 / 100^2
        assert!(field.x < 0.0);
        assert!((field.length() - 8.0 / 10_000.0).abs() < 1e-5);
    }
}
