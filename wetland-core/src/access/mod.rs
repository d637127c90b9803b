//! Record-level permission checks for the CRUVED model.
//!
//! The evaluator works on already-resolved data: a [`UserContext`] carrying
//! the datasets the user and their organism act on, and a record exposing
//! its ownership through [`RecordOwnership`]. Nothing here performs I/O, so
//! every check is a pure function of its inputs.

mod directory;
mod level;

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use thiserror::Error;

pub use directory::{DatasetActor, DatasetDirectory, DirectoryError};
pub use level::{AccessLevel, CruvedAction, CruvedParseError, CruvedView, UserCruved};

use crate::{DatasetId, OrganismId, UserId};

/// Identity and dataset rights of the user performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    /// Identifier of the user.
    pub id: UserId,
    /// Organism the user belongs to, if any.
    pub organism_id: Option<OrganismId>,
    /// Datasets on which the user is a direct actor.
    pub own_datasets: BTreeSet<DatasetId>,
    /// Datasets on which the user or their organism acts.
    pub organism_datasets: BTreeSet<DatasetId>,
}

impl UserContext {
    /// User without any dataset rights.
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            organism_id: None,
            own_datasets: BTreeSet::new(),
            organism_datasets: BTreeSet::new(),
        }
    }

    /// Resolve both dataset sets through `directory`.
    ///
    /// # Errors
    /// Propagates the [`DirectoryError`] of either lookup.
    pub fn resolve(
        id: UserId,
        organism_id: Option<OrganismId>,
        directory: &dyn DatasetDirectory,
    ) -> Result<Self, DirectoryError> {
        let own_datasets = directory.user_datasets(id, organism_id, true)?;
        let organism_datasets = directory.user_datasets(id, organism_id, false)?;
        Ok(Self {
            id,
            organism_id,
            own_datasets,
            organism_datasets,
        })
    }

    fn datasets_for(&self, level: AccessLevel) -> &BTreeSet<DatasetId> {
        if level == AccessLevel::OwnOnly {
            &self.own_datasets
        } else {
            &self.organism_datasets
        }
    }
}

/// Ownership attributes a record exposes to the evaluator.
pub trait RecordOwnership {
    /// User who digitised the record.
    fn digitiser_id(&self) -> UserId;
    /// Users who contributed to the record.
    fn observer_ids(&self) -> &BTreeSet<UserId>;
    /// Dataset the record belongs to, if any.
    fn dataset_id(&self) -> Option<DatasetId>;
}

/// Plain ownership data, for callers without a full record at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipSnapshot {
    /// User who digitised the record.
    pub digitiser_id: UserId,
    /// Users who contributed to the record.
    pub observer_ids: BTreeSet<UserId>,
    /// Dataset the record belongs to.
    pub dataset_id: Option<DatasetId>,
}

impl OwnershipSnapshot {
    /// Snapshot of a record digitised by `digitiser_id` with no observers or
    /// dataset.
    #[must_use]
    pub const fn digitised_by(digitiser_id: UserId) -> Self {
        Self {
            digitiser_id,
            observer_ids: BTreeSet::new(),
            dataset_id: None,
        }
    }
}

impl RecordOwnership for OwnershipSnapshot {
    fn digitiser_id(&self) -> UserId {
        self.digitiser_id
    }

    fn observer_ids(&self) -> &BTreeSet<UserId> {
        &self.observer_ids
    }

    fn dataset_id(&self) -> Option<DatasetId> {
        self.dataset_id
    }
}

/// The user lacks the level required for an action on a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("User \"{user}\" cannot \"{action}\" this current zh")]
pub struct InsufficientRightsError {
    /// User who attempted the action.
    pub user: UserId,
    /// Attempted action.
    pub action: CruvedAction,
    /// Level the user held for the action.
    pub level: AccessLevel,
}

impl InsufficientRightsError {
    /// HTTP-equivalent status of the failure.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        403
    }
}

/// Stateless permission evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessEvaluator;

impl AccessEvaluator {
    /// Decide whether `user` holding `level` may act on `record`.
    ///
    /// Rules apply in order and the first match wins:
    ///
    /// 1. [`AccessLevel::None`] denies.
    /// 2. [`AccessLevel::All`] allows.
    /// 3. The digitiser and every observer are allowed.
    /// 4. Rights over the record's dataset allow, looked up among the
    ///    user's own datasets for [`AccessLevel::OwnOnly`] and among the
    ///    organism's datasets otherwise, but only for
    ///    [`AccessLevel::Organization`] or above.
    /// 5. Anything else denies.
    ///
    /// # Examples
    /// ```
    /// use wetland_core::{AccessEvaluator, AccessLevel, OwnershipSnapshot, UserContext, UserId};
    ///
    /// let owner = UserContext::new(UserId(1));
    /// let stranger = UserContext::new(UserId(2));
    /// let record = OwnershipSnapshot::digitised_by(UserId(1));
    ///
    /// assert!(AccessEvaluator.is_allowed(&owner, &record, AccessLevel::OwnOnly));
    /// assert!(!AccessEvaluator.is_allowed(&stranger, &record, AccessLevel::Organization));
    /// assert!(AccessEvaluator.is_allowed(&stranger, &record, AccessLevel::All));
    /// ```
    #[must_use]
    pub fn is_allowed<R>(self, user: &UserContext, record: &R, level: AccessLevel) -> bool
    where
        R: RecordOwnership + ?Sized,
    {
        match level {
            AccessLevel::None => return false,
            AccessLevel::All => return true,
            AccessLevel::OwnOnly | AccessLevel::Organization => {}
        }
        if user.id == record.digitiser_id() || record.observer_ids().contains(&user.id) {
            return true;
        }
        let has_dataset_rights = record
            .dataset_id()
            .is_some_and(|dataset| user.datasets_for(level).contains(&dataset));
        has_dataset_rights && level >= AccessLevel::Organization
    }

    /// Return `record` when `user` may perform `action` at `level`.
    ///
    /// # Errors
    /// Returns [`InsufficientRightsError`] when [`Self::is_allowed`] denies.
    pub fn authorize<'r, R>(
        self,
        user: &UserContext,
        record: &'r R,
        action: CruvedAction,
        level: AccessLevel,
    ) -> Result<&'r R, InsufficientRightsError>
    where
        R: RecordOwnership + ?Sized,
    {
        if self.is_allowed(user, record, level) {
            return Ok(record);
        }
        warn!(
            "user {} denied {action} (level {level}) on record digitised by {}",
            user.id,
            record.digitiser_id()
        );
        Err(InsufficientRightsError {
            user: user.id,
            action,
            level,
        })
    }

    /// Effective permission of `user` on `record` for every action.
    #[must_use]
    pub fn cruved_view<R>(self, user: &UserContext, record: &R, cruved: &UserCruved) -> CruvedView
    where
        R: RecordOwnership + ?Sized,
    {
        let allowed: BTreeMap<_, _> = cruved
            .iter()
            .map(|(action, level)| (action, self.is_allowed(user, record, level)))
            .collect();
        CruvedView::new(allowed)
    }
}
