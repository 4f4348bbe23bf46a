//! Communal deck of unit cards.
//!
//! Every player draws from one shared pool, so a unit type is only as
//! common as its copies in the deck.

use tactics_core::battle::RosterEntry;
use tactics_core::data::GameData;
use tactics_core::rng::RandomStream;

/// Shuffled pool of unit job types.
#[derive(Debug, Clone, Default)]
pub struct CommunalDeck {
    cards: Vec<i32>,
}

impl CommunalDeck {
    /// Build a deck holding `copies` of every unit type, shuffled with `rng`.
    #[must_use]
    pub fn build(data: &GameData, copies: usize, rng: &mut RandomStream) -> Self {
        let types = data.unit_type_count() as i32;
        let mut cards: Vec<i32> = (0..types)
            .flat_map(|job_type| std::iter::repeat(job_type).take(copies))
            .collect();

        // Fisher-Yates, drawing from the server stream.
        for i in (1..cards.len()).rev() {
            let j = rng.next_int_in_range(0, i as i32) as usize;
            cards.swap(i, j);
        }
        Self { cards }
    }

    /// Cards left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check whether the deck is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Take up to `count` cards from the top.
    pub fn draw(&mut self, count: usize) -> Vec<i32> {
        let keep = self.cards.len().saturating_sub(count);
        let mut drawn = self.cards.split_off(keep);
        drawn.reverse();
        drawn
    }

    /// Deal a roster of up to `count` units, slots from 0, with unit ids
    /// taken from `next_unit_id`.
    pub fn deal_roster(&mut self, count: usize, next_unit_id: &mut i32) -> Vec<RosterEntry> {
        self.draw(count)
            .into_iter()
            .zip(0..)
            .map(|(job_type, slot_id)| {
                let unit_id = *next_unit_id;
                *next_unit_id += 1;
                RosterEntry {
                    job_type,
                    unit_id,
                    slot_id,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_test_utils::fixtures::shipped_data;

    #[test]
    fn test_build_holds_every_copy() {
        let data = shipped_data();
        let mut rng = RandomStream::new(3);
        let deck = CommunalDeck::build(&data, 4, &mut rng);
        assert_eq!(deck.len(), data.unit_type_count() * 4);
        for job_type in 0..data.unit_type_count() as i32 {
            assert_eq!(deck.cards.iter().filter(|&&c| c == job_type).count(), 4);
        }
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let data = shipped_data();
        let a = CommunalDeck::build(&data, 4, &mut RandomStream::new(3));
        let b = CommunalDeck::build(&data, 4, &mut RandomStream::new(3));
        let c = CommunalDeck::build(&data, 4, &mut RandomStream::new(4));
        assert_eq!(a.cards, b.cards);
        assert_ne!(a.cards, c.cards);
    }

    #[test]
    fn test_deal_assigns_slots_and_unique_ids() {
        let data = shipped_data();
        let mut deck = CommunalDeck::build(&data, 2, &mut RandomStream::new(1));
        let total = deck.len();
        let mut next_unit_id = 0;
        let first = deck.deal_roster(3, &mut next_unit_id);
        let second = deck.deal_roster(3, &mut next_unit_id);

        assert_eq!(deck.len(), total - 6);
        assert_eq!(first.iter().map(|e| e.slot_id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(second.iter().map(|e| e.unit_id).collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_draw_past_empty() {
        let data = shipped_data();
        let mut deck = CommunalDeck::build(&data, 1, &mut RandomStream::new(2));
        assert!(CommunalDeck::default().draw(3).is_empty());

        let mut next_unit_id = 0;
        let roster = deck.deal_roster(data.unit_type_count() + 4, &mut next_unit_id);
        assert_eq!(roster.len(), data.unit_type_count());
        assert_eq!(next_unit_id as usize, roster.len());
        assert!(deck.is_empty());
    }
}
