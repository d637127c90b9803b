//! Behavioural tests for `AccessEvaluator` using rstest-bdd.

use std::cell::RefCell;
use std::collections::BTreeSet;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use wetland_core::{
    AccessEvaluator, AccessLevel, CruvedAction, DatasetDirectory, DatasetId, DirectoryError,
    InsufficientRightsError, OrganismId, OwnershipSnapshot, UserContext, UserId,
};

const DATASET: DatasetId = DatasetId(10);
const ORGANISM: OrganismId = OrganismId(7);

/// Directory where a single organism manages [`DATASET`].
struct OrganismDirectory;

impl DatasetDirectory for OrganismDirectory {
    fn user_datasets(
        &self,
        _user: UserId,
        organism: Option<OrganismId>,
        only_own: bool,
    ) -> Result<BTreeSet<DatasetId>, DirectoryError> {
        if !only_own && organism == Some(ORGANISM) {
            return Ok(BTreeSet::from([DATASET]));
        }
        Ok(BTreeSet::new())
    }
}

#[derive(Debug, Default)]
struct AccessWorld {
    record: RefCell<Option<OwnershipSnapshot>>,
    user: RefCell<Option<UserContext>>,
    decision: RefCell<Option<Result<(), InsufficientRightsError>>>,
}

impl AccessWorld {
    fn set_user(&self, user: UserContext) {
        *self.user.borrow_mut() = Some(user);
    }

    fn check(&self, level: AccessLevel) {
        let record = self.record.borrow().clone().expect("record set");
        let user = self.user.borrow().clone().expect("user set");
        let decision = AccessEvaluator
            .authorize(&user, &record, CruvedAction::Update, level)
            .map(|_| ());
        *self.decision.borrow_mut() = Some(decision);
    }
}

#[fixture]
fn world() -> AccessWorld {
    AccessWorld::default()
}

#[given("a wetland digitised by user 1 in dataset 10")]
fn digitised_wetland(world: &AccessWorld) {
    let mut record = OwnershipSnapshot::digitised_by(UserId(1));
    record.dataset_id = Some(DATASET);
    *world.record.borrow_mut() = Some(record);
}

#[given("user 1 whose organism holds no dataset")]
fn digitiser(world: &AccessWorld) {
    let user = UserContext::resolve(UserId(1), Some(OrganismId(99)), &OrganismDirectory)
        .expect("resolve datasets");
    world.set_user(user);
}

#[given("user 2 listed as an observer of the wetland")]
fn observer(world: &AccessWorld) {
    if let Some(record) = world.record.borrow_mut().as_mut() {
        record.observer_ids.insert(UserId(2));
    }
    world.set_user(UserContext::new(UserId(2)));
}

#[given("user 3 whose organism manages dataset 10")]
fn organism_member(world: &AccessWorld) {
    let user = UserContext::resolve(UserId(3), Some(ORGANISM), &OrganismDirectory)
        .expect("resolve datasets");
    world.set_user(user);
}

#[given("user 4 with no link to the wetland")]
fn stranger(world: &AccessWorld) {
    world.set_user(UserContext::new(UserId(4)));
}

#[when("access is checked at none level")]
fn check_none(world: &AccessWorld) {
    world.check(AccessLevel::None);
}

#[when("access is checked at own-only level")]
fn check_own(world: &AccessWorld) {
    world.check(AccessLevel::OwnOnly);
}

#[when("access is checked at organization level")]
fn check_organization(world: &AccessWorld) {
    world.check(AccessLevel::Organization);
}

#[when("access is checked at all level")]
fn check_all(world: &AccessWorld) {
    world.check(AccessLevel::All);
}

#[then("access is granted")]
fn granted(world: &AccessWorld) {
    let decision = world.decision.borrow().clone().expect("access checked");
    assert_eq!(decision, Ok(()));
}

#[then("access is denied with a 403 status")]
fn denied(world: &AccessWorld) {
    let decision = world.decision.borrow().clone().expect("access checked");
    let err = decision.expect_err("access denied");
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.action, CruvedAction::Update);
}

#[scenario(path = "tests/features/access.feature", index = 0)]
fn digitiser_has_own_access(world: AccessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/access.feature", index = 1)]
fn observer_has_own_access(world: AccessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/access.feature", index = 2)]
fn organism_grants_organization_access(world: AccessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/access.feature", index = 3)]
fn organism_does_not_grant_own_access(world: AccessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/access.feature", index = 4)]
fn strangers_need_all(world: AccessWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/access.feature", index = 5)]
fn none_denies_everyone(world: AccessWorld) {
    let _ = world;
}
