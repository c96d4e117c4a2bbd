//! Coupon Associations
//!
//! Editing a coupon replaces its association sets. The change is expressed as
//! a diff against what is stored so only the rows that actually change are
//! written.

use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::{
    catalog::ProductUuid,
    coupons::definition::{CouponTarget, SignupAudience},
    uuids::{CategoryUuid, UserUuid},
};

/// Members to add and remove for one association kind, each sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationChanges<T> {
    /// Members to insert.
    pub added: Vec<T>,

    /// Members to delete.
    pub removed: Vec<T>,
}

impl<T: Copy + Ord + Hash> AssociationChanges<T> {
    /// Changes that turn `current` into `target`.
    #[must_use]
    pub fn between(current: &FxHashSet<T>, target: &FxHashSet<T>) -> Self {
        let mut added: Vec<T> = target.difference(current).copied().collect();
        let mut removed: Vec<T> = current.difference(target).copied().collect();

        added.sort_unstable();
        removed.sort_unstable();

        Self { added, removed }
    }

    /// Nothing to add or remove.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Every association a coupon holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationSet {
    /// Targeted products.
    pub products: FxHashSet<ProductUuid>,

    /// Targeted categories.
    pub categories: FxHashSet<CategoryUuid>,

    /// Targeted users.
    pub users: FxHashSet<UserUuid>,
}

impl AssociationSet {
    /// Associations implied by a coupon target.
    #[must_use]
    pub fn of(target: &CouponTarget) -> Self {
        match target {
            CouponTarget::Products {
                products,
                categories,
            } => Self {
                products: products.clone(),
                categories: categories.clone(),
                users: FxHashSet::default(),
            },
            CouponTarget::NewSignup(SignupAudience::Users(users)) => Self {
                users: users.clone(),
                ..Self::default()
            },
            CouponTarget::CartValue { .. } | CouponTarget::NewSignup(SignupAudience::AllNewUsers) => {
                Self::default()
            }
        }
    }

    /// Diff that replaces `current` with `self`.
    #[must_use]
    pub fn changes_from(&self, current: &Self) -> AssociationDiff {
        AssociationDiff {
            products: AssociationChanges::between(&current.products, &self.products),
            categories: AssociationChanges::between(&current.categories, &self.categories),
            users: AssociationChanges::between(&current.users, &self.users),
        }
    }
}

/// Per-kind changes replacing one association set with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDiff {
    /// Product changes.
    pub products: AssociationChanges<ProductUuid>,

    /// Category changes.
    pub categories: AssociationChanges<CategoryUuid>,

    /// User changes.
    pub users: AssociationChanges<UserUuid>,
}

impl AssociationDiff {
    /// Nothing changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.categories.is_empty() && self.users.is_empty()
    }
}
