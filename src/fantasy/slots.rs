/*!

Roster slots and player positions.

A roster is an ordered list of slots. Each slot accepts a fixed set of player positions, and a roster is valid when
every player can sit in a different slot that accepts them. That is a bipartite matching between players and slots;
[`assign`] finds a maximum matching with augmenting paths, visiting slots from most to least specific so players
settle into their natural slot before a flexible one.

*/

use std::{fmt, str::FromStr};

pub const MAX_SLOTS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
    G,
    F,
    UTIL,
}

impl Position {
    pub const ALL: [Position; 8] = [
        Position::PG,
        Position::SG,
        Position::SF,
        Position::PF,
        Position::C,
        Position::G,
        Position::F,
        Position::UTIL,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::PG => "PG",
            Position::SG => "SG",
            Position::SF => "SF",
            Position::PF => "PF",
            Position::C => "C",
            Position::G => "G",
            Position::F => "F",
            Position::UTIL => "UTIL",
        }
    }

    /// Whether a slot labelled `self` can hold a player tagged `player`.
    pub fn accepts(&self, player: Position) -> bool {
        use Position::*;
        match self {
            PG => matches!(player, PG | G),
            SG => matches!(player, SG | G),
            SF => matches!(player, SF | F),
            PF => matches!(player, PF | F | UTIL | SF | C),
            C => player == C,
            G => matches!(player, PG | SG | G),
            F => matches!(player, SF | PF | F),
            UTIL => true,
        }
    }

    /// Exact positions first, then the G/F groups, then UTIL.
    pub fn specificity(&self) -> u8 {
        match self {
            Position::PG | Position::SG | Position::SF | Position::PF | Position::C => 0,
            Position::G | Position::F => 1,
            Position::UTIL => 2,
        }
    }

    /// Maps a stats-provider position such as `"G-F"` or `"Center"` to a tag. The first component wins; unknown or
    /// empty positions become UTIL.
    pub fn from_provider(raw: &str) -> Position {
        let first = raw.split(['-', '/']).next().unwrap_or("").trim();
        match first.to_ascii_uppercase().as_str() {
            "GUARD" => Position::G,
            "FORWARD" => Position::F,
            "CENTER" => Position::C,
            other => other.parse().unwrap_or(Position::UTIL),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("Unknown slot `{0}`. Valid slots: PG, SG, SF, PF, C, G, F, UTIL.")]
    Unknown(String),
    #[error("A roster needs at least one slot.")]
    Empty,
    #[error("A roster can have at most {MAX_SLOTS} slots.")]
    TooMany,
}

impl FromStr for Position {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == upper)
            .ok_or_else(|| SlotError::Unknown(s.trim().to_string()))
    }
}

pub fn default_slots() -> Vec<Position> {
    use Position::*;
    vec![PG, SG, SF, PF, C, G, F, UTIL, UTIL, UTIL]
}

/// Parses a comma or whitespace separated slot list such as `"PG, SG, UTIL"`.
pub fn parse_slots(text: &str) -> Result<Vec<Position>, SlotError> {
    let slots = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Position>, _>>()?;
    match slots.len() {
        0 => Err(SlotError::Empty),
        n if n > MAX_SLOTS => Err(SlotError::TooMany),
        _ => Ok(slots),
    }
}

pub fn format_slots(slots: &[Position]) -> String {
    slots.iter().map(Position::as_str).collect::<Vec<_>>().join(",")
}

/// A concrete seating: `slots[i]` holds the index of the player in slot `i`, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineup {
    pub slots: Vec<(Position, Option<usize>)>,
    /// Players that could not be seated, in input order.
    pub bench: Vec<usize>,
}

impl Lineup {
    pub fn seated(&self) -> usize {
        self.slots.iter().filter(|(_, p)| p.is_some()).count()
    }
}

struct Matcher<'a> {
    slots: &'a [Position],
    players: &'a [Position],
    /// Slot indices from most to least specific, declared order within a rank.
    order: Vec<usize>,
    owner: Vec<Option<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(slots: &'a [Position], players: &'a [Position]) -> Self {
        let mut order: Vec<usize> = (0..slots.len()).collect();
        order.sort_by_key(|&i| (slots[i].specificity(), i));
        Self {
            slots,
            players,
            order,
            owner: vec![None; slots.len()],
        }
    }

    fn place(&mut self, player: usize) -> bool {
        let position = self.players[player];
        let free = self
            .order
            .iter()
            .copied()
            .find(|&s| self.owner[s].is_none() && self.slots[s].accepts(position));
        if let Some(slot) = free {
            self.owner[slot] = Some(player);
            return true;
        }
        let mut visited = vec![false; self.slots.len()];
        self.augment(player, &mut visited)
    }

    fn augment(&mut self, player: usize, visited: &mut [bool]) -> bool {
        let position = self.players[player];
        for i in 0..self.order.len() {
            let slot = self.order[i];
            if visited[slot] || !self.slots[slot].accepts(position) {
                continue;
            }
            visited[slot] = true;
            let movable = match self.owner[slot] {
                None => true,
                Some(current) => self.augment(current, visited),
            };
            if movable {
                self.owner[slot] = Some(player);
                return true;
            }
        }
        false
    }
}

/// Seats as many players as possible. Every player is seated whenever [`is_feasible`] holds.
pub fn assign(slots: &[Position], players: &[Position]) -> Lineup {
    let mut matcher = Matcher::new(slots, players);
    let bench = (0..players.len()).filter(|&p| !matcher.place(p)).collect();
    Lineup {
        slots: slots.iter().copied().zip(matcher.owner).collect(),
        bench,
    }
}

/// True when every player fits in a distinct compatible slot.
pub fn is_feasible(slots: &[Position], players: &[Position]) -> bool {
    players.len() <= slots.len() && assign(slots, players).bench.is_empty()
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::{Position::*, *};

    fn brute_force(slots: &[Position], players: &[Position], used: &mut Vec<bool>) -> bool {
        let Some((first, rest)) = players.split_first() else {
            return true;
        };
        for i in 0..slots.len() {
            if !used[i] && slots[i].accepts(*first) {
                used[i] = true;
                let ok = brute_force(slots, rest, used);
                used[i] = false;
                if ok {
                    return true;
                }
            }
        }
        false
    }

    fn assert_valid(lineup: &Lineup, players: &[Position]) {
        let mut seen = std::collections::HashSet::new();
        for (slot, player) in &lineup.slots {
            if let Some(p) = player {
                assert!(slot.accepts(players[*p]), "{} cannot hold {}", slot, players[*p]);
                assert!(seen.insert(*p), "player {} seated twice", p);
            }
        }
        for p in &lineup.bench {
            assert!(!seen.contains(p));
        }
        assert_eq!(seen.len() + lineup.bench.len(), players.len());
    }

    #[test]
    fn center_and_guard_fit_center_and_util() {
        let slots = [C, UTIL];
        let players = [C, G];
        assert!(is_feasible(&slots, &players));
        let lineup = assign(&slots, &players);
        assert_eq!(lineup.slots, vec![(C, Some(0)), (UTIL, Some(1))]);
    }

    #[test]
    fn two_centers_do_not_fit_one_center_slot() {
        assert!(!is_feasible(&[C], &[C, C]));
    }

    #[test]
    fn more_players_than_slots_is_infeasible() {
        assert!(!is_feasible(&[UTIL, UTIL], &[G, G, G]));
    }

    #[test]
    fn exclusive_slot_conflict_is_infeasible() {
        // Both centers need C or UTIL; only one of each exists beside a guard-only slot.
        assert!(!is_feasible(&[C, PG], &[C, C]));
        assert!(is_feasible(&[C, UTIL, PG], &[C, C, PG]));
    }

    #[test]
    fn specific_slots_fill_before_flexible_ones() {
        let lineup = assign(&[UTIL, G, C], &[PG, C]);
        assert_eq!(lineup.slots, vec![(UTIL, None), (G, Some(0)), (C, Some(1))]);
    }

    #[test]
    fn augmenting_moves_an_earlier_player() {
        // The center takes PF first, then moves to C to make room for the power forward.
        let slots = [PF, C];
        let players = [C, PF];
        let lineup = assign(&slots, &players);
        assert_eq!(lineup.slots, vec![(PF, Some(1)), (C, Some(0))]);
        assert!(lineup.bench.is_empty());
        assert_valid(&lineup, &players);
    }

    #[test]
    fn default_roster_of_ten_fits() {
        assert!(is_feasible(&default_slots(), &[PG, SG, SF, PF, C, G, F, C, C, C]));
        assert!(!is_feasible(&default_slots(), &[C, C, C, C, C, C]));
    }

    #[test]
    fn empty_slots_are_shown_not_errors() {
        let lineup = assign(&[PG, C], &[]);
        assert_eq!(lineup.slots, vec![(PG, None), (C, None)]);
        assert!(lineup.bench.is_empty());
    }

    #[test]
    fn agrees_with_exhaustive_search() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..500 {
            let slots: Vec<Position> = (0..rng.random_range(1..=6))
                .map(|_| Position::ALL[rng.random_range(0..8)])
                .collect();
            let players: Vec<Position> = (0..rng.random_range(0..=6))
                .map(|_| Position::ALL[rng.random_range(0..8)])
                .collect();
            let expected =
                players.len() <= slots.len() && brute_force(&slots, &players, &mut vec![false; slots.len()]);
            assert_eq!(is_feasible(&slots, &players), expected, "{:?} / {:?}", slots, players);
            let lineup = assign(&slots, &players);
            assert_valid(&lineup, &players);
            if expected {
                assert!(lineup.bench.is_empty());
            }
        }
    }

    #[test]
    fn parses_slot_lists() {
        assert_eq!(parse_slots("pg, sg util").unwrap(), vec![PG, SG, UTIL]);
        assert_eq!(parse_slots("PG,XX"), Err(SlotError::Unknown("XX".into())));
        assert_eq!(parse_slots(" , "), Err(SlotError::Empty));
        assert_eq!(parse_slots(&vec!["UTIL"; 16].join(",")), Err(SlotError::TooMany));
        assert_eq!(parse_slots(&format_slots(&default_slots())).unwrap(), default_slots());
    }

    #[test]
    fn maps_provider_positions() {
        assert_eq!(Position::from_provider("G-F"), G);
        assert_eq!(Position::from_provider("C-F"), C);
        assert_eq!(Position::from_provider("Forward"), F);
        assert_eq!(Position::from_provider(""), UTIL);
        assert_eq!(Position::from_provider("PG"), PG);
    }
}
