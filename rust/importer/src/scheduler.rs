// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dependency Scheduler - write order over importer kinds
//!
//! Every kind gets a weight: a kind's weight is at least one more than the
//! weight of anything that depends on it. Writing kinds in descending
//! weight therefore always commits a dependency before its dependents.
//! Ties keep declaration order.
//!
//! The full order and one partial order per kind (the kind plus its
//! transitive dependencies) are computed once at construction.

use crate::error::{ImportError, Result};
use crate::kind::ImporterKind;
use smallvec::SmallVec;

const N: usize = ImporterKind::COUNT;

/// Precomputed write orders.
#[derive(Debug, Clone)]
pub struct DependencyScheduler {
    weights: [u32; N],
    full_order: Vec<ImporterKind>,
    partial_orders: Vec<Vec<ImporterKind>>,
}

impl DependencyScheduler {
    /// Scheduler over the declared dependencies of [`ImporterKind`].
    pub fn new() -> Result<Self> {
        Self::with_dependencies(ImporterKind::dependencies)
    }

    /// Scheduler over an arbitrary dependency relation.
    ///
    /// Returns [`ImportError::DependencyCycle`] if the relation is not a DAG.
    pub fn with_dependencies<F>(deps: F) -> Result<Self>
    where
        F: Fn(ImporterKind) -> &'static [ImporterKind],
    {
        let weights = compute_weights(&deps)?;

        let mut full_order = ImporterKind::ALL.to_vec();
        // stable: equal weights keep declaration order
        full_order.sort_by(|a, b| weights[b.index()].cmp(&weights[a.index()]));

        let partial_orders = ImporterKind::ALL
            .iter()
            .map(|&kind| {
                let closure = dependency_closure(kind, &deps);
                full_order
                    .iter()
                    .copied()
                    .filter(|k| closure[k.index()])
                    .collect()
            })
            .collect();

        Ok(Self {
            weights,
            full_order,
            partial_orders,
        })
    }

    /// Write order for `target` and its transitive dependencies, or for
    /// every kind when `target` is `None`.
    pub fn execution_order(&self, target: Option<ImporterKind>) -> Vec<ImporterKind> {
        match target {
            Some(kind) => self.order_for(kind).to_vec(),
            None => self.full_order.clone(),
        }
    }

    /// Borrowed partial order for `kind`. Always ends with `kind` itself.
    #[inline]
    pub fn order_for(&self, kind: ImporterKind) -> &[ImporterKind] {
        &self.partial_orders[kind.index()]
    }

    #[inline]
    pub fn full_order(&self) -> &[ImporterKind] {
        &self.full_order
    }

    #[inline]
    pub fn weight(&self, kind: ImporterKind) -> u32 {
        self.weights[kind.index()]
    }
}

fn compute_weights<F>(deps: &F) -> Result<[u32; N]>
where
    F: Fn(ImporterKind) -> &'static [ImporterKind],
{
    let mut weights = [0u32; N];

    // The longest chain in a DAG has at most N - 1 edges, so relaxation
    // settles within N passes. Still changing after that means a cycle.
    for _ in 0..=N {
        let mut changed = false;
        for kind in ImporterKind::ALL {
            let required = weights[kind.index()] + 1;
            for &dep in deps(kind) {
                if weights[dep.index()] < required {
                    weights[dep.index()] = required;
                    changed = true;
                }
            }
        }
        if !changed {
            return Ok(weights);
        }
    }

    let culprit = ImporterKind::ALL
        .iter()
        .copied()
        .max_by_key(|k| weights[k.index()])
        .unwrap_or(ImporterKind::SurfaceGeometry);
    Err(ImportError::DependencyCycle(culprit))
}

fn dependency_closure<F>(kind: ImporterKind, deps: &F) -> [bool; N]
where
    F: Fn(ImporterKind) -> &'static [ImporterKind],
{
    let mut included = [false; N];
    let mut stack: SmallVec<[ImporterKind; 8]> = SmallVec::new();
    stack.push(kind);
    while let Some(next) = stack.pop() {
        if std::mem::replace(&mut included[next.index()], true) {
            continue;
        }
        stack.extend(deps(next).iter().copied());
    }
    included
}

#[cfg(test)]
mod tests {
    use super::*;
    use ImporterKind::*;

    fn position(order: &[ImporterKind], kind: ImporterKind) -> usize {
        order.iter().position(|&k| k == kind).unwrap()
    }

    #[test]
    fn dependencies_precede_dependents() {
        let scheduler = DependencyScheduler::new().unwrap();
        let order = scheduler.full_order();
        assert_eq!(order.len(), ImporterKind::COUNT);
        for kind in ImporterKind::ALL {
            for &dep in kind.dependencies() {
                assert!(
                    position(order, dep) < position(order, kind),
                    "{dep} must be written before {kind}"
                );
                assert!(scheduler.weight(dep) > scheduler.weight(kind));
            }
        }
    }

    #[test]
    fn partial_order_is_restricted_to_closure() {
        let scheduler = DependencyScheduler::new().unwrap();
        let order = scheduler.execution_order(Some(Room));
        assert_eq!(order.last(), Some(&Room));
        assert!(order.contains(&Building));
        assert!(order.contains(&CityObject));
        assert!(order.contains(&SurfaceGeometry));
        assert!(!order.contains(&Address));
        assert!(!order.contains(&Appearance));

        assert_eq!(scheduler.order_for(SurfaceData), &[SurfaceData]);
    }

    #[test]
    fn texture_param_waits_for_geometry_and_surface_data() {
        let scheduler = DependencyScheduler::new().unwrap();
        let order = scheduler.order_for(TextureParam);
        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&TextureParam));
        assert!(order.contains(&CityObject));
    }

    #[test]
    fn full_order_is_deterministic() {
        let a = DependencyScheduler::new().unwrap();
        let b = DependencyScheduler::new().unwrap();
        assert_eq!(a.full_order(), b.full_order());
        assert_eq!(a.execution_order(None), a.full_order());
    }

    #[test]
    fn cycle_is_rejected() {
        fn cyclic(kind: ImporterKind) -> &'static [ImporterKind] {
            match kind {
                Building => &[Room],
                Room => &[Building],
                _ => &[],
            }
        }
        let result = DependencyScheduler::with_dependencies(cyclic);
        assert!(matches!(result, Err(ImportError::DependencyCycle(_))));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        fn self_referencing(kind: ImporterKind) -> &'static [ImporterKind] {
            match kind {
                Address => &[Address],
                _ => &[],
            }
        }
        let result = DependencyScheduler::with_dependencies(self_referencing);
        assert!(matches!(result, Err(ImportError::DependencyCycle(Address))));
    }
}
