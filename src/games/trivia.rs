use std::{future::Future, time::Duration};

use poise::serenity_prelude::{CreateEmbed, UserId};
use tracing::{debug, info};

use crate::{
    Error,
    games::{
        answers::AnswerMatcher,
        round::{Answerer, Prompt, RoundChannel},
    },
    infrastructure::{colors, ids::mention_user, sessions::Session},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriviaRules {
    pub max_rounds: u32,
    pub winning_score: u32,
    pub answer_timeout: Duration,
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub prompt: Prompt,
    pub matcher: AnswerMatcher,
    /// Shown when the round is resolved.
    pub answer: String,
}

/// The question source could not produce a question; the game ends with this message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SourceError(pub String);

pub trait QuestionSource: Send {
    fn next_question(&mut self, round: u32) -> impl Future<Output = Result<Question, SourceError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub user_id: UserId,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    WinningScore,
    RoundLimit,
    Stopped,
    SourceFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaOutcome {
    pub reason: EndReason,
    pub rounds_played: u32,
    /// Highest score first; ties keep the order in which players first scored.
    pub standings: Vec<ScoreEntry>,
}

impl TriviaOutcome {
    /// The player who reached the threshold, or the leader when the game ran out of rounds.
    pub fn winner(&self) -> Option<&ScoreEntry> {
        match self.reason {
            EndReason::WinningScore | EndReason::RoundLimit => self.standings.first(),
            EndReason::Stopped | EndReason::SourceFailed => None,
        }
    }
}

#[derive(Default)]
struct Scoreboard {
    entries: Vec<ScoreEntry>,
}

impl Scoreboard {
    fn award(&mut self, answerer: &Answerer) -> u32 {
        match self.entries.iter_mut().find(|e| e.user_id == answerer.user_id) {
            Some(entry) => {
                entry.score += 1;
                entry.score
            }
            None => {
                self.entries.push(ScoreEntry {
                    user_id: answerer.user_id,
                    name: answerer.name.clone(),
                    score: 1,
                });
                1
            }
        }
    }

    fn into_standings(mut self) -> Vec<ScoreEntry> {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries
    }
}

/// Runs rounds until someone reaches the winning score, the round limit is hit, the session is stopped, or the
/// source gives out.
pub async fn run_trivia<C, Q>(
    channel: &mut C,
    session: &mut Session,
    source: &mut Q,
    rules: TriviaRules,
) -> Result<TriviaOutcome, Error>
where
    C: RoundChannel,
    Q: QuestionSource,
{
    let mut scores = Scoreboard::default();
    let mut reason = EndReason::RoundLimit;
    let mut rounds_played = 0;

    for round in 1..=rules.max_rounds {
        if session.is_stopped() {
            reason = EndReason::Stopped;
            break;
        }

        let question = match source.next_question(round).await {
            Ok(question) => question,
            Err(e) => {
                info!(round, "Question source failed: {}", e);
                channel.say(format!("❌ {}", e)).await?;
                reason = EndReason::SourceFailed;
                break;
            }
        };
        rounds_played = round;
        debug!(round, answer = %question.answer, "Asking question");
        channel.show(question.prompt).await?;

        let answer = tokio::select! {
            answer = channel.await_answer(question.matcher, rules.answer_timeout) => answer?,
            _ = session.stopped() => {
                reason = EndReason::Stopped;
                break;
            }
        };

        match answer {
            Some(answerer) => {
                let score = scores.award(&answerer);
                channel
                    .say(format!(
                        "✅ **Correct!** It was **{}**. {} has {} point{}.",
                        question.answer,
                        answerer.mention(),
                        score,
                        if score == 1 { "" } else { "s" }
                    ))
                    .await?;
                if score >= rules.winning_score {
                    channel
                        .say(format!("🏆 {} wins with {} points!", answerer.mention(), score))
                        .await?;
                    reason = EndReason::WinningScore;
                    break;
                }
            }
            None => {
                channel
                    .say(format!("⏰ **Time's up!** It was **{}**.", question.answer))
                    .await?;
            }
        }

        if round < rules.max_rounds {
            channel.pause(rules.pause).await;
        }
    }

    Ok(TriviaOutcome {
        reason,
        rounds_played,
        standings: scores.into_standings(),
    })
}

/// The closing summary. `None` when nobody scored.
pub fn standings_embed(title: &str, outcome: &TriviaOutcome) -> Option<CreateEmbed> {
    if outcome.standings.is_empty() {
        return None;
    }
    let description = outcome
        .standings
        .iter()
        .map(|entry| format!("{}: {}", mention_user(entry.user_id), entry.score))
        .collect::<Vec<_>>()
        .join("\n");
    Some(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .colour(colors::gold()),
    )
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::{ChannelId, Colour};

    use super::*;
    use crate::{
        games::round::fake::{ScriptedChannel, player},
        infrastructure::sessions::{GameKind, SessionRegistry},
    };

    struct CountingSource {
        asked: u32,
        fail_on: Option<u32>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                asked: 0,
                fail_on: None,
            }
        }
    }

    impl QuestionSource for CountingSource {
        async fn next_question(&mut self, round: u32) -> Result<Question, SourceError> {
            if self.fail_on == Some(round) {
                return Err(SourceError("Could not load images.".into()));
            }
            self.asked += 1;
            Ok(Question {
                prompt: Prompt::new(format!("Round {}", round), Colour::RED),
                matcher: AnswerMatcher::any_of([format!("answer {}", round)]),
                answer: format!("Answer {}", round),
            })
        }
    }

    fn rules(max_rounds: u32, winning_score: u32) -> TriviaRules {
        TriviaRules {
            max_rounds,
            winning_score,
            answer_timeout: Duration::from_secs(15),
            pause: Duration::from_secs(2),
        }
    }

    fn session(registry: &SessionRegistry) -> Session {
        registry.try_begin(ChannelId::new(5), GameKind::F1Quiz).unwrap()
    }

    #[tokio::test]
    async fn reaching_the_threshold_ends_immediately() {
        let registry = SessionRegistry::default();
        let mut session = session(&registry);
        let alice = player(1, "alice");
        let bob = player(2, "bob");
        let mut channel = ScriptedChannel::with_answers([
            Some(alice.clone()),
            Some(bob.clone()),
            Some(alice.clone()),
            Some(alice.clone()),
            Some(bob.clone()),
        ]);
        let mut source = CountingSource::new();

        let outcome = run_trivia(&mut channel, &mut session, &mut source, rules(30, 3))
            .await
            .unwrap();

        assert_eq!(outcome.reason, EndReason::WinningScore);
        assert_eq!(outcome.rounds_played, 4);
        assert_eq!(source.asked, 4);
        assert_eq!(outcome.winner().unwrap().user_id, alice.user_id);
        assert_eq!(outcome.standings[0].score, 3);
        assert_eq!(outcome.standings[1].score, 1);
        assert!(channel.said.last().unwrap().starts_with("🏆"));
    }

    #[tokio::test]
    async fn round_limit_picks_the_leader() {
        let registry = SessionRegistry::default();
        let mut session = session(&registry);
        let mut channel = ScriptedChannel::with_answers([None, Some(player(9, "carol")), None]);

        let outcome = run_trivia(&mut channel, &mut session, &mut CountingSource::new(), rules(3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.reason, EndReason::RoundLimit);
        assert_eq!(outcome.rounds_played, 3);
        assert_eq!(outcome.winner().unwrap().name, "carol");
        assert!(standings_embed("Final Scores", &outcome).is_some());
        assert_eq!(channel.waits.len(), 3);
        // Pauses only between rounds.
        assert_eq!(channel.paused, Duration::from_secs(4));
        assert_eq!(
            channel.said.iter().filter(|s| s.starts_with("⏰")).count(),
            2
        );
    }

    #[tokio::test]
    async fn silent_game_has_no_winner() {
        let registry = SessionRegistry::default();
        let mut session = session(&registry);
        let mut channel = ScriptedChannel::default();

        let outcome = run_trivia(&mut channel, &mut session, &mut CountingSource::new(), rules(2, 10))
            .await
            .unwrap();

        assert!(outcome.standings.is_empty());
        assert!(outcome.winner().is_none());
        assert!(standings_embed("Final Scores", &outcome).is_none());
    }

    #[tokio::test]
    async fn source_failure_ends_the_game_with_a_message() {
        let registry = SessionRegistry::default();
        let mut session = session(&registry);
        let mut channel = ScriptedChannel::with_answers([Some(player(1, "alice"))]);
        let mut source = CountingSource {
            asked: 0,
            fail_on: Some(2),
        };

        let outcome = run_trivia(&mut channel, &mut session, &mut source, rules(30, 10))
            .await
            .unwrap();

        assert_eq!(outcome.reason, EndReason::SourceFailed);
        assert_eq!(outcome.rounds_played, 1);
        assert!(outcome.winner().is_none());
        assert_eq!(channel.said.last().unwrap(), "❌ Could not load images.");
    }

    #[tokio::test]
    async fn stopped_session_asks_nothing() {
        let registry = SessionRegistry::default();
        let mut session = session(&registry);
        registry.stop(session.channel());
        let mut source = CountingSource::new();

        let outcome = run_trivia(&mut ScriptedChannel::default(), &mut session, &mut source, rules(30, 10))
            .await
            .unwrap();

        assert_eq!(outcome.reason, EndReason::Stopped);
        assert_eq!(source.asked, 0);
    }
}
