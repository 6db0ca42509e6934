use std::{collections::HashMap, time::Duration};

use rand::{Rng, seq::IndexedRandom, seq::SliceRandom};
use tracing::{debug, warn};

use crate::{
    Error,
    games::{
        answers::AnswerMatcher,
        round::{Prompt, RoundChannel},
    },
    infrastructure::{colors, sessions::Session},
};

const SHORT: Duration = Duration::from_secs(10);
const LONG: Duration = Duration::from_secs(15);

const PHRASES: &[&str] = &[
    "Fastest finger first!",
    "Basketball is life",
    "Full court press",
    "Three point shot",
    "SLAM DUNK",
    "Alley-oop!",
];
const SCRAMBLE_WORDS: &[&str] = &["BASKETBALL", "COURT", "DRIBBLE", "WHISTLE", "JERSEY", "STADIUM", "REFEREE", "TROPHY"];
const SPORTS_EMOJIS: &[&str] = &["🏀", "⚽", "🏈", "⚾", "🎾", "🏐", "🏉", "🎱"];
const COLOR_EMOJIS: &[(&str, &str)] = &[
    ("🔴", "RED"),
    ("🔵", "BLUE"),
    ("🟢", "GREEN"),
    ("🟡", "YELLOW"),
    ("⚪", "WHITE"),
];
const QUICK_TRIVIA: &[(&str, &str)] = &[
    ("How many players are on the court per team in NBA?", "5"),
    ("Which team does LeBron James play for currently?", "Lakers"),
    ("What is the highest points scored in a single game by Wilt Chamberlain?", "100"),
    ("How many quarters are in an NBA game?", "4"),
];
const REVERSE_WORDS: &[&str] = &["DUNK", "STADIUM", "PLAYOFF", "LEAGUE", "CHAMPION"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    ReactionSpeed,
    MathRush,
    RepeatPhrase,
    Scramble,
    EmojiHunt,
    ColorMatch,
    CountEm,
    QuickTrivia,
    ReverseIt,
    MemoryBlink,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 10] = [
        ChallengeKind::ReactionSpeed,
        ChallengeKind::MathRush,
        ChallengeKind::RepeatPhrase,
        ChallengeKind::Scramble,
        ChallengeKind::EmojiHunt,
        ChallengeKind::ColorMatch,
        ChallengeKind::CountEm,
        ChallengeKind::QuickTrivia,
        ChallengeKind::ReverseIt,
        ChallengeKind::MemoryBlink,
    ];
}

/// A prompt shown first and replaced by the real prompt after `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct Teaser {
    pub prompt: Prompt,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub kind: ChallengeKind,
    pub teaser: Option<Teaser>,
    pub prompt: Prompt,
    pub matcher: AnswerMatcher,
    pub timeout: Duration,
    /// Posted when someone answers; `{winner}` is replaced by their mention.
    pub win_text: String,
    pub timeout_text: String,
}

impl Challenge {
    fn new(kind: ChallengeKind, prompt: Prompt, matcher: AnswerMatcher, timeout: Duration) -> Self {
        Self {
            kind,
            teaser: None,
            prompt,
            matcher,
            timeout,
            win_text: "🏆 {winner} got it first!".into(),
            timeout_text: "Too slow!".into(),
        }
    }

    fn teaser(mut self, prompt: Prompt, delay: Duration) -> Self {
        self.teaser = Some(Teaser { prompt, delay });
        self
    }

    fn win_text(mut self, text: impl Into<String>) -> Self {
        self.win_text = text.into();
        self
    }

    fn timeout_text(mut self, text: impl Into<String>) -> Self {
        self.timeout_text = text.into();
        self
    }

    pub fn render_win(&self, winner: &str) -> String {
        let vars = HashMap::from([("winner".to_string(), winner.to_string())]);
        strfmt::strfmt(&self.win_text, &vars).unwrap_or_else(|e| {
            warn!("Bad win text {:?}: {}", self.win_text, e);
            format!("🏆 {} got it first!", winner)
        })
    }
}

pub fn random_kind<R: Rng + ?Sized>(rng: &mut R) -> ChallengeKind {
    ChallengeKind::ALL[rng.random_range(0..ChallengeKind::ALL.len())]
}

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    // Every list above is non-empty.
    &items[rng.random_range(0..items.len())]
}

fn scramble<R: Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let mut letters: Vec<char> = word.chars().collect();
    letters.shuffle(rng);
    letters.into_iter().collect()
}

pub fn generate<R: Rng + ?Sized>(kind: ChallengeKind, rng: &mut R) -> Challenge {
    match kind {
        ChallengeKind::ReactionSpeed => {
            let wait = Duration::from_millis(rng.random_range(2000..=5000));
            Challenge::new(
                kind,
                Prompt::new("⚡ Reaction Speed", colors::green()).description("**CLICK NOW!** (Type `GO`!)"),
                AnswerMatcher::IgnoreCase("go".into()),
                SHORT,
            )
            .teaser(
                Prompt::new("⚡ Reaction Speed", colors::yellow()).description("Wait for it..."),
                wait,
            )
            .win_text("🏆 {winner} was the fastest!")
            .timeout_text("Too slow! No one reacted.")
        }
        ChallengeKind::MathRush => {
            let op = *["+", "-", "*"].choose(rng).unwrap_or(&"+");
            let (a, b): (i64, i64) = if op == "*" {
                (rng.random_range(2..=12), rng.random_range(2..=12))
            } else {
                (rng.random_range(10..=50), rng.random_range(10..=50))
            };
            let answer = match op {
                "+" => a + b,
                "-" => a - b,
                _ => a * b,
            };
            Challenge::new(
                kind,
                Prompt::new("🧮 Math Rush", colors::blue()).description(format!("Quick! What is **{} {} {}**?", a, op, b)),
                AnswerMatcher::Exact(answer.to_string()),
                LONG,
            )
            .win_text("🏆 {winner} got it right first!")
            .timeout_text(format!("Time's up! The answer was {}.", answer))
        }
        ChallengeKind::RepeatPhrase => {
            let phrase = *pick(PHRASES, rng);
            Challenge::new(
                kind,
                Prompt::new("✍️ Type Fast!", colors::purple()).description(format!("Repeat this: **{}**", phrase)),
                AnswerMatcher::Exact(phrase.into()),
                LONG,
            )
            .win_text("🏆 {winner} typed it first!")
        }
        ChallengeKind::Scramble => {
            let word = *pick(SCRAMBLE_WORDS, rng);
            Challenge::new(
                kind,
                Prompt::new("🧩 Unscramble!", colors::orange())
                    .description(format!("Unscramble: **{}**", scramble(word, rng))),
                AnswerMatcher::IgnoreCase(word.into()),
                LONG,
            )
            .win_text(format!("🏆 {{winner}} solved it! The word was **{}**.", word))
            .timeout_text(format!("Time's up! The word was {}.", word))
        }
        ChallengeKind::EmojiHunt => {
            let target = *pick(SPORTS_EMOJIS, rng);
            Challenge::new(
                kind,
                Prompt::new("🎯 Emoji Hunt", colors::red()).description(format!("Type the emoji: **{}**", target)),
                AnswerMatcher::Exact(target.into()),
                SHORT,
            )
            .win_text("🏆 {winner} caught it!")
            .timeout_text("No one found it.")
        }
        ChallengeKind::ColorMatch => {
            let (emoji, name) = *pick(COLOR_EMOJIS, rng);
            Challenge::new(
                kind,
                Prompt::new("🎨 Color Match", colors::dark_grey()).description(format!("What color is this: {}?", emoji)),
                AnswerMatcher::IgnoreCase(name.into()),
                SHORT,
            )
            .win_text("🏆 {winner} knows their colors!")
            .timeout_text(format!("Time's up! It was {}.", name))
        }
        ChallengeKind::CountEm => {
            let count = rng.random_range(5..=12usize);
            Challenge::new(
                kind,
                Prompt::new("🔢 Count 'Em!", colors::dark_orange())
                    .description(format!("How many balls are there?\n\n{}", "🏀".repeat(count))),
                AnswerMatcher::Exact(count.to_string()),
                LONG,
            )
            .win_text(format!("🏆 {{winner}} counted {} correctly!", count))
            .timeout_text(format!("Time's up! There were {}.", count))
        }
        ChallengeKind::QuickTrivia => {
            let (question, answer) = *pick(QUICK_TRIVIA, rng);
            Challenge::new(
                kind,
                Prompt::new("💡 Quick Trivia", colors::gold()).description(question),
                AnswerMatcher::contains(answer),
                LONG,
            )
            .win_text(format!("🏆 {{winner}} is a pro! Answer: **{}**", answer))
            .timeout_text(format!("No one knew? It was {}.", answer))
        }
        ChallengeKind::ReverseIt => {
            let word = *pick(REVERSE_WORDS, rng);
            let reversed: String = word.chars().rev().collect();
            Challenge::new(
                kind,
                Prompt::new("🔃 Reverse It!", colors::teal()).description(format!("Type **{}** BACKWARDS!", word)),
                AnswerMatcher::IgnoreCase(reversed.clone()),
                LONG,
            )
            .win_text(format!("🏆 {{winner}} reversed it! **{}**", reversed))
            .timeout_text(format!("Too hard? It was {}.", reversed))
        }
        ChallengeKind::MemoryBlink => {
            let number = rng.random_range(10000..=99999u32);
            Challenge::new(
                kind,
                Prompt::new("🧠 What was the number?", colors::slate()),
                AnswerMatcher::Exact(number.to_string()),
                SHORT,
            )
            .teaser(
                Prompt::new("🧠 Remember this:", colors::slate()).description(format!("`{}`", number)),
                Duration::from_secs(2),
            )
            .win_text("🏆 {winner} has a perfect memory!")
            .timeout_text(format!("Time's up! It was {}.", number))
        }
    }
}

/// Plays one challenge. Returns whether anybody answered.
pub async fn run_challenge<C: RoundChannel>(
    channel: &mut C,
    session: &mut Session,
    challenge: Challenge,
) -> Result<bool, Error> {
    debug!(kind = ?challenge.kind, "Running minigame");
    if let Some(teaser) = challenge.teaser.clone() {
        channel.show(teaser.prompt).await?;
        tokio::select! {
            _ = channel.pause(teaser.delay) => {}
            _ = session.stopped() => return Ok(false),
        }
        channel.reveal(challenge.prompt.clone()).await?;
    } else {
        channel.show(challenge.prompt.clone()).await?;
    }

    let answer = tokio::select! {
        answer = channel.await_answer(challenge.matcher.clone(), challenge.timeout) => answer?,
        _ = session.stopped() => return Ok(false),
    };

    match answer {
        Some(winner) => {
            channel.say(challenge.render_win(&winner.mention())).await?;
            Ok(true)
        }
        None => {
            channel.say(challenge.timeout_text.clone()).await?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude::ChannelId;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        games::round::fake::{ScriptedChannel, player},
        infrastructure::sessions::{GameKind, SessionRegistry},
    };

    #[test]
    fn every_kind_generates_a_challenge_with_a_known_timeout() {
        let mut rng = StdRng::seed_from_u64(11);
        for kind in ChallengeKind::ALL {
            let challenge = generate(kind, &mut rng);
            assert_eq!(challenge.kind, kind);
            assert!(challenge.timeout == SHORT || challenge.timeout == LONG);
            assert!(challenge.render_win("@me").contains("@me"));
        }
    }

    #[test]
    fn math_rush_answer_matches_the_question() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..30 {
            let challenge = generate(ChallengeKind::MathRush, &mut rng);
            let description = challenge.prompt.description.clone().unwrap();
            let expr = description
                .trim_start_matches("Quick! What is **")
                .trim_end_matches("**?")
                .to_string();
            let parts: Vec<&str> = expr.split(' ').collect();
            let (a, b): (i64, i64) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
            let expected = match parts[1] {
                "+" => a + b,
                "-" => a - b,
                _ => a * b,
            };
            assert!(challenge.matcher.matches(&expected.to_string()));
        }
    }

    #[test]
    fn scramble_keeps_the_letters() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut scrambled: Vec<char> = scramble("BASKETBALL", &mut rng).chars().collect();
        let mut original: Vec<char> = "BASKETBALL".chars().collect();
        scrambled.sort();
        original.sort();
        assert_eq!(scrambled, original);
    }

    #[test]
    fn reaction_speed_waits_two_to_five_seconds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            let challenge = generate(ChallengeKind::ReactionSpeed, &mut rng);
            let delay = challenge.teaser.unwrap().delay;
            assert!(delay >= Duration::from_secs(2) && delay <= Duration::from_secs(5));
            assert!(challenge.matcher.matches("GO"));
        }
    }

    #[tokio::test]
    async fn memory_blink_hides_the_number_before_asking() {
        let registry = SessionRegistry::default();
        let mut session = registry.try_begin(ChannelId::new(1), GameKind::Minigame).unwrap();
        let mut channel = ScriptedChannel::with_answers([Some(player(4, "dave"))]);
        let challenge = generate(ChallengeKind::MemoryBlink, &mut StdRng::seed_from_u64(1));

        let answered = run_challenge(&mut channel, &mut session, challenge).await.unwrap();

        assert!(answered);
        assert_eq!(channel.shown.len(), 1);
        assert_eq!(channel.revealed.len(), 1);
        assert_eq!(channel.paused, Duration::from_secs(2));
        assert_eq!(channel.said, vec!["🏆 <@4> has a perfect memory!".to_string()]);
    }

    #[tokio::test]
    async fn timeout_posts_the_answer() {
        let registry = SessionRegistry::default();
        let mut session = registry.try_begin(ChannelId::new(1), GameKind::Minigame).unwrap();
        let mut channel = ScriptedChannel::default();
        let challenge = generate(ChallengeKind::CountEm, &mut StdRng::seed_from_u64(1));
        let expected = challenge.timeout_text.clone();

        let answered = run_challenge(&mut channel, &mut session, challenge).await.unwrap();

        assert!(!answered);
        assert_eq!(channel.waits[0].1, LONG);
        assert_eq!(channel.said, vec![expected]);
    }
}
