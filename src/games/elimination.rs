use std::{collections::HashMap, time::Duration};

use poise::serenity_prelude::UserId;
use rand::{Rng, seq::IndexedRandom};
use tracing::{info, warn};

use crate::{Error, games::round::RoundChannel, infrastructure::sessions::Session};

pub const DEATH_MESSAGES: &[&str] = &[
    "{victim} was used as a human shield by {killer}.",
    "{victim} accidentally drank bleach thinking it was a health potion.",
    "{victim} was pushed into a meat grinder by {killer}.",
    "{victim}'s parachute was replaced with a backpack full of bricks by {killer}.",
    "{victim} tried to high-five a moving train.",
    "{victim} was force-fed a live grenade by {killer}.",
    "{victim} choked on their own hubris.",
    "{victim} was sacrificed to the dark gods by {killer}.",
    "{victim} forgot that gravity is a thing.",
    "{victim} was beaten to death with their own severed leg by {killer}.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub name: String,
}

/// Players who joined before the gates closed, in join order.
#[derive(Debug, Default)]
pub struct Lobby {
    players: Vec<Participant>,
}

impl Lobby {
    /// Returns false when the player is already in.
    pub fn join(&mut self, player: Participant) -> bool {
        if self.players.iter().any(|p| p.user_id == player.user_id) {
            return false;
        }
        self.players.push(player);
        true
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn into_players(self) -> Vec<Participant> {
        self.players
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub victim: Participant,
    pub killer: Participant,
    pub survivors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EliminationOutcome {
    Winner {
        survivor: Participant,
        eliminations: usize,
    },
    Stopped {
        eliminations: usize,
    },
}

/// Removes a random victim and picks their killer among the survivors. Needs at least two players.
pub fn eliminate_one<R: Rng + ?Sized>(players: &mut Vec<Participant>, rng: &mut R) -> Option<Elimination> {
    if players.len() < 2 {
        return None;
    }
    let victim = players.remove(rng.random_range(0..players.len()));
    let killer = players.choose(rng)?.clone();
    Some(Elimination {
        victim,
        killer,
        survivors: players.len(),
    })
}

/// Renders a death template. Unknown placeholders fall back to a plain message.
pub fn render_death_message(template: &str, victim: &str, killer: &str) -> String {
    let vars = HashMap::from([
        ("victim".to_string(), victim.to_string()),
        ("killer".to_string(), killer.to_string()),
    ]);
    strfmt::strfmt(template, &vars).unwrap_or_else(|e| {
        warn!("Bad death message template {:?}: {}", template, e);
        format!("{} was eliminated by {}.", victim, killer)
    })
}

/// Eliminates players one at a time until a single survivor remains or the session is stopped.
pub async fn run_elimination<C, R>(
    channel: &mut C,
    session: &mut Session,
    mut players: Vec<Participant>,
    templates: &[&str],
    interval: Duration,
    rng: &mut R,
) -> Result<EliminationOutcome, Error>
where
    C: RoundChannel,
    R: Rng + Send,
{
    let mut eliminations = 0;
    while players.len() > 1 {
        tokio::select! {
            _ = channel.pause(interval) => {}
            _ = session.stopped() => {}
        }
        if session.is_stopped() {
            info!(eliminations, "Battle royale stopped");
            return Ok(EliminationOutcome::Stopped { eliminations });
        }

        let Some(event) = eliminate_one(&mut players, rng) else {
            break;
        };
        eliminations += 1;
        let template = templates.choose(rng).copied().unwrap_or("{victim} was eliminated by {killer}.");
        let message = render_death_message(
            template,
            &format!("**{}**", event.victim.name),
            &format!("**{}**", event.killer.name),
        );
        channel
            .say(format!("💀 {} - {} survivors remain.", message, event.survivors))
            .await?;
    }

    match players.pop() {
        Some(survivor) => Ok(EliminationOutcome::Winner {
            survivor,
            eliminations,
        }),
        None => Err("Battle royale ended without any players".into()),
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::ChannelId;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        games::round::fake::ScriptedChannel,
        infrastructure::sessions::{GameKind, SessionRegistry},
    };

    fn lobby(n: u64) -> Vec<Participant> {
        (1..=n)
            .map(|id| Participant {
                user_id: UserId::new(id),
                name: format!("player{}", id),
            })
            .collect()
    }

    #[test]
    fn killer_is_never_the_victim() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut players = lobby(3);
            let event = eliminate_one(&mut players, &mut rng).unwrap();
            assert_ne!(event.victim, event.killer);
            assert!(players.contains(&event.killer));
            assert!(!players.contains(&event.victim));
            assert_eq!(event.survivors, 2);
        }
    }

    #[test]
    fn cannot_eliminate_from_a_single_player() {
        let mut players = lobby(1);
        assert!(eliminate_one(&mut players, &mut StdRng::seed_from_u64(1)).is_none());
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn renders_both_placeholders() {
        assert_eq!(
            render_death_message(DEATH_MESSAGES[0], "**a**", "**b**"),
            "**a** was used as a human shield by **b**."
        );
        assert_eq!(
            render_death_message("{victim} tripped.", "a", "b"),
            "a tripped."
        );
    }

    #[test]
    fn malformed_template_still_produces_a_message() {
        assert_eq!(render_death_message("{nobody} died", "a", "b"), "a was eliminated by b.");
    }

    #[tokio::test]
    async fn n_players_produce_n_minus_one_eliminations() {
        for n in 2..=8u64 {
            let registry = SessionRegistry::default();
            let mut session = registry
                .try_begin(ChannelId::new(1), GameKind::BattleRoyale)
                .unwrap();
            let mut channel = ScriptedChannel::default();
            let players = lobby(n);

            let outcome = run_elimination(
                &mut channel,
                &mut session,
                players.clone(),
                DEATH_MESSAGES,
                Duration::from_secs(4),
                &mut StdRng::seed_from_u64(n),
            )
            .await
            .unwrap();

            match outcome {
                EliminationOutcome::Winner {
                    survivor,
                    eliminations,
                } => {
                    assert_eq!(eliminations as u64, n - 1);
                    assert!(players.contains(&survivor));
                }
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(channel.said.len() as u64, n - 1);
            assert!(channel.said.last().unwrap().ends_with("1 survivors remain."));
        }
    }

    #[tokio::test]
    async fn stopping_ends_the_match_early() {
        let registry = SessionRegistry::default();
        let channel_id = ChannelId::new(2);
        let mut session = registry.try_begin(channel_id, GameKind::BattleRoyale).unwrap();
        registry.stop(channel_id);

        let outcome = run_elimination(
            &mut ScriptedChannel::default(),
            &mut session,
            lobby(5),
            DEATH_MESSAGES,
            Duration::from_secs(4),
            &mut StdRng::seed_from_u64(3),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EliminationOutcome::Stopped { eliminations: 0 });
    }

    #[test]
    fn lobby_ignores_second_join() {
        let mut lobby = Lobby::default();
        let alice = Participant {
            user_id: UserId::new(1),
            name: "alice".into(),
        };
        assert!(lobby.join(alice.clone()));
        assert!(!lobby.join(alice));
        assert!(lobby.join(Participant {
            user_id: UserId::new(2),
            name: "bob".into(),
        }));
        assert_eq!(lobby.len(), 2);
        assert_eq!(lobby.into_players()[1].name, "bob");
    }
}
