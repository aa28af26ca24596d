//! In-memory implementation of the directory port.
//!
//! Both collections live in one [`DirectoryState`] behind a single
//! `RwLock`. Writers validate every name and referenced id under the write
//! lock before touching either side of the relation, so a refused operation
//! leaves the state untouched and readers never see half of a membership change.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::contract::model::{
    EntityKind, Group, GroupId, GroupPatch, NewGroup, NewUser, User, UserId, UserPatch,
};
use crate::domain::repo::{DirectoryRepository, StoreError};

#[derive(Debug)]
struct DirectoryState {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    user_names: HashMap<String, UserId>,
    group_names: HashMap<String, GroupId>,
    next_user_id: UserId,
    next_group_id: GroupId,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            user_names: HashMap::new(),
            group_names: HashMap::new(),
            next_user_id: 1,
            next_group_id: 1,
        }
    }
}

/// Ids from `wanted` that are not keys of `present`, ascending.
fn missing_ids<V>(present: &BTreeMap<u64, V>, wanted: &BTreeSet<u64>) -> Vec<u64> {
    wanted
        .iter()
        .filter(|id| !present.contains_key(*id))
        .copied()
        .collect()
}

/// Fails if `name` belongs to an entity other than `owner`.
fn ensure_name_free(
    index: &HashMap<String, u64>,
    kind: EntityKind,
    name: &str,
    owner: Option<u64>,
) -> Result<(), StoreError> {
    match index.get(name) {
        Some(holder) if Some(*holder) != owner => Err(StoreError::DuplicateName {
            kind,
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

fn ensure_known(kind: EntityKind, missing: Vec<u64>) -> Result<(), StoreError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(StoreError::UnknownReference { kind, ids: missing })
    }
}

impl DirectoryState {
    fn create_user(&mut self, new_user: NewUser) -> Result<User, StoreError> {
        ensure_known(
            EntityKind::Group,
            missing_ids(&self.groups, &new_user.groups),
        )?;
        ensure_name_free(&self.user_names, EntityKind::User, &new_user.name, None)?;

        let id = self.next_user_id;
        self.next_user_id += 1;
        for gid in &new_user.groups {
            if let Some(group) = self.groups.get_mut(gid) {
                group.users.insert(id);
            }
        }

        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            groups: new_user.groups,
        };
        self.user_names.insert(user.name.clone(), id);
        self.users.insert(id, user.clone());
        Ok(user)
    }

    fn create_group(&mut self, new_group: NewGroup) -> Result<Group, StoreError> {
        ensure_known(EntityKind::User, missing_ids(&self.users, &new_group.users))?;
        ensure_name_free(&self.group_names, EntityKind::Group, &new_group.name, None)?;

        let id = self.next_group_id;
        self.next_group_id += 1;
        for uid in &new_group.users {
            if let Some(user) = self.users.get_mut(uid) {
                user.groups.insert(id);
            }
        }

        let group = Group {
            id,
            name: new_group.name,
            users: new_group.users,
        };
        self.group_names.insert(group.name.clone(), id);
        self.groups.insert(id, group.clone());
        Ok(group)
    }

    fn update_user(&mut self, id: UserId, patch: UserPatch) -> Result<User, StoreError> {
        let user = self.users.get_mut(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::User,
            id,
        })?;
        if let Some(ref groups) = patch.groups {
            ensure_known(EntityKind::Group, missing_ids(&self.groups, groups))?;
        }
        if let Some(ref name) = patch.name {
            ensure_name_free(&self.user_names, EntityKind::User, name, Some(id))?;
        }

        // Everything below is infallible.
        if let Some(groups) = patch.groups {
            for gid in user.groups.difference(&groups) {
                if let Some(group) = self.groups.get_mut(gid) {
                    group.users.remove(&id);
                }
            }
            for gid in groups.difference(&user.groups) {
                if let Some(group) = self.groups.get_mut(gid) {
                    group.users.insert(id);
                }
            }
            user.groups = groups;
        }
        if let Some(name) = patch.name {
            self.user_names.remove(&user.name);
            self.user_names.insert(name.clone(), id);
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        Ok(user.clone())
    }

    fn update_group(&mut self, id: GroupId, patch: GroupPatch) -> Result<Group, StoreError> {
        let group = self.groups.get_mut(&id).ok_or(StoreError::NotFound {
            kind: EntityKind::Group,
            id,
        })?;
        if let Some(ref users) = patch.users {
            ensure_known(EntityKind::User, missing_ids(&self.users, users))?;
        }
        if let Some(ref name) = patch.name {
            ensure_name_free(&self.group_names, EntityKind::Group, name, Some(id))?;
        }

        if let Some(users) = patch.users {
            for uid in group.users.difference(&users) {
                if let Some(user) = self.users.get_mut(uid) {
                    user.groups.remove(&id);
                }
            }
            for uid in users.difference(&group.users) {
                if let Some(user) = self.users.get_mut(uid) {
                    user.groups.insert(id);
                }
            }
            group.users = users;
        }
        if let Some(name) = patch.name {
            self.group_names.remove(&group.name);
            self.group_names.insert(name.clone(), id);
            group.name = name;
        }
        Ok(group.clone())
    }

    fn delete_user(&mut self, id: UserId) -> bool {
        let Some(user) = self.users.remove(&id) else {
            return false;
        };
        self.user_names.remove(&user.name);
        for gid in &user.groups {
            if let Some(group) = self.groups.get_mut(gid) {
                group.users.remove(&id);
            }
        }
        true
    }

    fn delete_group(&mut self, id: GroupId) -> bool {
        let Some(group) = self.groups.remove(&id) else {
            return false;
        };
        self.group_names.remove(&group.name);
        for uid in &group.users {
            if let Some(user) = self.users.get_mut(uid) {
                user.groups.remove(&id);
            }
        }
        true
    }

    /// Checks membership symmetry and the name indexes.
    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let users_ok = self.users.values().all(|u| {
            self.user_names.get(&u.name) == Some(&u.id)
                && u.groups.iter().all(|gid| {
                    self.groups
                        .get(gid)
                        .is_some_and(|g| g.users.contains(&u.id))
                })
        });
        let groups_ok = self.groups.values().all(|g| {
            self.group_names.get(&g.name) == Some(&g.id)
                && g.users.iter().all(|uid| {
                    self.users
                        .get(uid)
                        .is_some_and(|u| u.groups.contains(&g.id))
                })
        });
        users_ok
            && groups_ok
            && self.user_names.len() == self.users.len()
            && self.group_names.len() == self.groups.len()
    }
}

/// Process-local membership directory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryDirectory {
    async fn list_users(&self) -> Vec<User> {
        self.state.read().users.values().cloned().collect()
    }

    async fn list_groups(&self) -> Vec<Group> {
        self.state.read().groups.values().cloned().collect()
    }

    async fn find_user(&self, id: UserId) -> Option<User> {
        self.state.read().users.get(&id).cloned()
    }

    async fn find_group(&self, id: GroupId) -> Option<Group> {
        self.state.read().groups.get(&id).cloned()
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = self.state.write().create_user(new_user)?;
        trace!(user_id = user.id, "user inserted");
        Ok(user)
    }

    async fn insert_group(&self, new_group: NewGroup) -> Result<Group, StoreError> {
        let group = self.state.write().create_group(new_group)?;
        trace!(group_id = group.id, "group inserted");
        Ok(group)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, StoreError> {
        self.state.write().update_user(id, patch)
    }

    async fn update_group(&self, id: GroupId, patch: GroupPatch) -> Result<Group, StoreError> {
        self.state.write().update_group(id, patch)
    }

    async fn delete_user(&self, id: UserId) -> bool {
        self.state.write().delete_user(id)
    }

    async fn delete_group(&self, id: GroupId) -> bool {
        self.state.write().delete_group(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[u64]) -> BTreeSet<u64> {
        v.iter().copied().collect()
    }

    fn new_user(name: &str, groups: &[u64]) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: format!("{name}@q.bio"),
            groups: ids(groups),
        }
    }

    fn new_group(name: &str, users: &[u64]) -> NewGroup {
        NewGroup {
            name: name.to_string(),
            users: ids(users),
        }
    }

    /// wheel(1), developers(2), marketing(3); alice(1) in 1,2; bob(2) in 2.
    fn seeded() -> DirectoryState {
        let mut s = DirectoryState::default();
        s.create_group(new_group("wheel", &[])).unwrap();
        s.create_group(new_group("developers", &[])).unwrap();
        s.create_group(new_group("marketing", &[])).unwrap();
        s.create_user(new_user("alice", &[1, 2])).unwrap();
        s.create_user(new_user("bob", &[2])).unwrap();
        assert!(s.is_consistent());
        s
    }

    #[test]
    fn ids_are_sequential_per_kind() {
        let s = seeded();
        assert_eq!(s.groups.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(s.users.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn create_user_joins_referenced_groups() {
        let s = seeded();
        assert_eq!(s.users[&1].groups, ids(&[1, 2]));
        assert_eq!(s.groups[&1].users, ids(&[1]));
        assert_eq!(s.groups[&2].users, ids(&[1, 2]));
        assert!(s.groups[&3].users.is_empty());
    }

    #[test]
    fn create_group_joins_referenced_users() {
        let mut s = seeded();
        let www = s.create_group(new_group("www", &[1, 2])).unwrap();
        assert_eq!(www.id, 4);
        assert!(s.users[&1].groups.contains(&4));
        assert!(s.users[&2].groups.contains(&4));
        assert!(s.is_consistent());
    }

    #[test]
    fn duplicate_name_leaves_state_unchanged() {
        let mut s = seeded();
        let before = format!("{s:?}");

        let err = s.create_user(new_user("alice", &[3])).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateName {
                kind: EntityKind::User,
                name: "alice".into()
            }
        );
        let err = s.create_group(new_group("wheel", &[2])).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { kind: EntityKind::Group, .. }));

        assert_eq!(format!("{s:?}"), before);
    }

    #[test]
    fn unknown_references_are_all_reported_and_nothing_is_written() {
        let mut s = seeded();
        let before = format!("{s:?}");

        let err = s.create_user(new_user("carol", &[1, 7, 9])).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownReference {
                kind: EntityKind::Group,
                ids: vec![7, 9]
            }
        );
        let err = s
            .update_group(
                2,
                GroupPatch {
                    users: Some(ids(&[1, 5])),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownReference {
                kind: EntityKind::User,
                ids: vec![5]
            }
        );

        // The failed create must not have consumed an id either.
        assert_eq!(s.next_user_id, 3);
        assert_eq!(format!("{s:?}"), before);
    }

    #[test]
    fn unknown_references_win_over_taken_names() {
        let mut s = seeded();

        let err = s.create_user(new_user("bob", &[9])).unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownReference {
                kind: EntityKind::Group,
                ids: vec![9]
            }
        );
        let err = s
            .update_group(
                3,
                GroupPatch {
                    name: Some("wheel".into()),
                    users: Some(ids(&[4])),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownReference { .. }));
        assert!(s.is_consistent());
    }

    #[test]
    fn membership_replacement_diffs_old_and_new_sets() {
        let mut s = seeded();
        // alice: {1,2} -> {2,3}
        let alice = s
            .update_user(
                1,
                UserPatch {
                    groups: Some(ids(&[2, 3])),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(alice.groups, ids(&[2, 3]));
        assert!(!s.groups[&1].users.contains(&1));
        assert!(s.groups[&2].users.contains(&1));
        assert!(s.groups[&3].users.contains(&1));
        assert!(s.is_consistent());
    }

    #[test]
    fn group_membership_replacement_is_symmetric() {
        let mut s = seeded();
        // developers: {1,2} -> {2}
        let dev = s
            .update_group(
                2,
                GroupPatch {
                    users: Some(ids(&[2])),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(dev.users, ids(&[2]));
        assert_eq!(s.users[&1].groups, ids(&[1]));
        assert_eq!(s.users[&2].groups, ids(&[2]));
        assert!(s.is_consistent());
    }

    #[test]
    fn rename_keeps_index_in_sync() {
        let mut s = seeded();
        let err = s
            .update_user(
                2,
                UserPatch {
                    name: Some("alice".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));

        // Renaming to its own name is a no-op, not a conflict.
        s.update_user(
            1,
            UserPatch {
                name: Some("alice".into()),
                ..Default::default()
            },
        )
        .unwrap();

        s.update_user(
            1,
            UserPatch {
                name: Some("alicia".into()),
                email: Some("alicia@q.bio".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(s.is_consistent());
        // The old name is free again.
        s.create_user(new_user("alice", &[])).unwrap();
        assert!(s.is_consistent());
    }

    #[test]
    fn update_of_missing_entity_is_not_found() {
        let mut s = seeded();
        let err = s.update_user(42, UserPatch::default()).unwrap_err();
        assert_eq!(
            err,
            StoreError::NotFound {
                kind: EntityKind::User,
                id: 42
            }
        );
        let err = s.update_group(42, GroupPatch::default()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Group, .. }));
    }

    #[test]
    fn delete_detaches_without_cascading() {
        let mut s = seeded();
        assert!(s.delete_group(2));
        assert_eq!(s.users[&1].groups, ids(&[1]));
        assert!(s.users[&2].groups.is_empty());
        assert_eq!(s.users.len(), 2);

        assert!(s.delete_user(1));
        assert!(s.groups[&1].users.is_empty());
        assert!(!s.delete_user(1));
        assert!(s.is_consistent());

        // Ids are never reused.
        let carol = s.create_user(new_user("carol", &[])).unwrap();
        assert_eq!(carol.id, 3);
    }

    #[tokio::test]
    async fn concurrent_writers_preserve_symmetry() {
        use std::sync::Arc;

        let dir = Arc::new(InMemoryDirectory::new());
        for n in 0..4 {
            dir.insert_group(new_group(&format!("g{n}"), &[])).await.unwrap();
        }

        let mut handles = Vec::new();
        for t in 0..8u64 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25u64 {
                    let name = format!("u{t}-{i}");
                    let user = dir
                        .insert_user(new_user(&name, &[1 + (i % 4)]))
                        .await
                        .unwrap();
                    dir.update_user(
                        user.id,
                        UserPatch {
                            groups: Some(ids(&[1 + ((i + t) % 4), 1 + ((i + 1) % 4)])),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
                    if i % 3 == 0 {
                        assert!(dir.delete_user(user.id).await);
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let state = dir.state.read();
        assert!(state.is_consistent());
        assert_eq!(state.users.len(), 8 * (25 - 9));
    }
}
