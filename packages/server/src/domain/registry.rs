//! Connection registry: who is connected, in which space, with which hue.

use super::{
    entity::Party,
    hue::assign_hue,
    value_object::{DisplayName, Hue, PartyId, Position, SpaceName, Timestamp},
};

/// Parties admitted into one or more spaces, in admission order.
///
/// Counting is a linear scan; the expected population is small.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    parties: Vec<Party>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new party into `space` and return a copy of its identity.
    ///
    /// `random_degrees` is only used when the space is empty.
    pub fn admit(
        &mut self,
        space: SpaceName,
        name: Option<DisplayName>,
        now: Timestamp,
        random_degrees: f64,
    ) -> Party {
        let hues: Vec<Hue> = self.parties_in(&space).map(|p| p.hue).collect();
        let hue = assign_hue(&hues, random_degrees);

        let mut id = PartyId::generate();
        while self.get(&id).is_some() {
            id = PartyId::generate();
        }

        let party = Party {
            id,
            space,
            hue,
            name,
            position: Position::CENTER,
            active: false,
            last_update: now,
        };
        self.parties.push(party.clone());
        party
    }

    /// Remove a party. Removing an unknown party is a no-op.
    pub fn remove(&mut self, id: &PartyId) -> Option<Party> {
        let index = self.parties.iter().position(|p| &p.id == id)?;
        Some(self.parties.remove(index))
    }

    pub fn get(&self, id: &PartyId) -> Option<&Party> {
        self.parties.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PartyId) -> Option<&mut Party> {
        self.parties.iter_mut().find(|p| &p.id == id)
    }

    pub fn parties_in<'a>(&'a self, space: &'a SpaceName) -> impl Iterator<Item = &'a Party> {
        self.parties.iter().filter(move |p| &p.space == space)
    }

    pub fn count_in(&self, space: &SpaceName) -> usize {
        self.parties_in(space).count()
    }

    /// IDs of every party in `space`, in admission order
    pub fn members_of(&self, space: &SpaceName) -> Vec<PartyId> {
        self.parties_in(space).map(|p| p.id.clone()).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.parties.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ConnectionRegistry の入室・退室・人数カウント
    // - 色相がスペースごとに分散して割り当てられること
    //
    // 【なぜこのテストが必要か】
    // - presence のブロードキャストはこの人数を信頼して送られる
    // - 人数が操作のたびに正しいことを保証する必要がある
    // ========================================

    fn space(name: &str) -> SpaceName {
        SpaceName::new(name.to_string()).unwrap()
    }

    #[test]
    fn test_admit_assigns_unique_identity() {
        // テスト項目: 入室ごとに一意な ID が割り当てられる
        // given (前提条件):
        let mut registry = ConnectionRegistry::new();

        // when (操作):
        let a = registry.admit(space("clearing"), None, Timestamp::new(0), 10.0);
        let b = registry.admit(space("clearing"), None, Timestamp::new(0), 10.0);

        // then (期待する結果):
        assert_ne!(a.id, b.id);
        assert_eq!(registry.count_in(&space("clearing")), 2);
    }

    #[test]
    fn test_hues_are_spread_within_a_space_only() {
        // テスト項目: 色相の分散は同じスペース内だけで計算される
        // given (前提条件):
        let mut registry = ConnectionRegistry::new();
        registry.admit(space("edge"), None, Timestamp::new(0), 40.0);

        // when (操作):
        let same_space = registry.admit(space("edge"), None, Timestamp::new(0), 0.0);
        let other_space = registry.admit(space("weave"), None, Timestamp::new(0), 40.0);

        // then (期待する結果):
        assert_eq!(same_space.hue.value(), 220.0);
        assert_eq!(other_space.hue.value(), 40.0);
    }

    #[test]
    fn test_remove_unknown_party_is_noop() {
        // テスト項目: 存在しない参加者の削除は何もしない
        // given (前提条件):
        let mut registry = ConnectionRegistry::new();
        registry.admit(space("clearing"), None, Timestamp::new(0), 0.0);

        // when (操作):
        let removed = registry.remove(&PartyId::generate());

        // then (期待する結果):
        assert!(removed.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_count_matches_model_after_every_operation() {
        // テスト項目: 任意の入退室の列に対して、各操作の直後の人数が常に正しい
        // given (前提条件):
        let mut rng = StdRng::seed_from_u64(7);
        let spaces = [space("garden"), space("clearing"), space("edge")];
        let mut registry = ConnectionRegistry::new();
        let mut model: HashMap<PartyId, SpaceName> = HashMap::new();

        for step in 0..500 {
            // when (操作):
            let remove = !model.is_empty() && rng.gen_bool(0.4);
            if remove {
                let victim = model.keys().nth(rng.gen_range(0..model.len())).cloned().unwrap();
                model.remove(&victim);
                registry.remove(&victim);
            } else {
                let target = spaces[rng.gen_range(0..spaces.len())].clone();
                let party = registry.admit(target.clone(), None, Timestamp::new(step), 0.0);
                model.insert(party.id, target);
            }

            // then (期待する結果):
            for s in &spaces {
                let expected = model.values().filter(|v| *v == s).count();
                assert_eq!(registry.count_in(s), expected, "step {}", step);
            }
        }
    }
}
