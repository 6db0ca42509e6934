use std::{sync::Arc, time::Duration};

use poise::serenity_prelude::Colour;
use rand::{rngs::StdRng, seq::IndexedRandom};

use crate::{
    games::{
        answers::AnswerMatcher,
        round::{Prompt, PromptImage},
        trivia::{Question, QuestionSource, SourceError, TriviaRules},
    },
    infrastructure::colors,
};

pub const RULES: TriviaRules = TriviaRules {
    max_rounds: 50,
    winning_score: 10,
    answer_timeout: Duration::from_secs(15),
    pause: Duration::from_secs(2),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Team {
    pub city: &'static str,
    pub nickname: &'static str,
    pub abbreviation: &'static str,
    /// ESPN's logo path segment, which does not always match the abbreviation.
    pub espn_code: &'static str,
    pub aliases: &'static [&'static str],
}

impl Team {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.city, self.nickname)
    }

    pub fn logo_url(&self) -> String {
        format!("https://a.espncdn.com/i/teamlogos/nba/500/{}.png", self.espn_code)
    }

    pub fn matcher(&self) -> AnswerMatcher {
        let mut answers = vec![self.full_name(), self.nickname.to_string(), self.abbreviation.to_string()];
        answers.extend(self.aliases.iter().map(|a| a.to_string()));
        AnswerMatcher::any_of(answers)
    }
}

macro_rules! team {
    ($city:expr, $nickname:expr, $abbr:expr, $espn:expr, [$($alias:expr),* $(,)?]) => {
        Team {
            city: $city,
            nickname: $nickname,
            abbreviation: $abbr,
            espn_code: $espn,
            aliases: &[$($alias),*],
        }
    };
}

pub const TEAMS: [Team; 30] = [
    team!("Atlanta", "Hawks", "ATL", "atl", []),
    team!("Boston", "Celtics", "BOS", "bos", []),
    team!("Brooklyn", "Nets", "BKN", "bkn", []),
    team!("Charlotte", "Hornets", "CHA", "cha", []),
    team!("Chicago", "Bulls", "CHI", "chi", []),
    team!("Cleveland", "Cavaliers", "CLE", "cle", ["cavs"]),
    team!("Dallas", "Mavericks", "DAL", "dal", ["mavs"]),
    team!("Denver", "Nuggets", "DEN", "den", ["nuggs"]),
    team!("Detroit", "Pistons", "DET", "det", []),
    team!("Golden State", "Warriors", "GSW", "gs", ["dubs"]),
    team!("Houston", "Rockets", "HOU", "hou", []),
    team!("Indiana", "Pacers", "IND", "ind", []),
    team!("LA", "Clippers", "LAC", "lac", ["clips", "los angeles clippers"]),
    team!("Los Angeles", "Lakers", "LAL", "lal", []),
    team!("Memphis", "Grizzlies", "MEM", "mem", ["grizz"]),
    team!("Miami", "Heat", "MIA", "mia", []),
    team!("Milwaukee", "Bucks", "MIL", "mil", []),
    team!("Minnesota", "Timberwolves", "MIN", "min", ["wolves", "t-wolves", "twolves"]),
    team!("New Orleans", "Pelicans", "NOP", "no", ["pels"]),
    team!("New York", "Knicks", "NYK", "ny", []),
    team!("Oklahoma City", "Thunder", "OKC", "okc", []),
    team!("Orlando", "Magic", "ORL", "orl", []),
    team!("Philadelphia", "76ers", "PHI", "phi", ["sixers"]),
    team!("Phoenix", "Suns", "PHX", "phx", []),
    team!("Portland", "Trail Blazers", "POR", "por", ["blazers"]),
    team!("Sacramento", "Kings", "SAC", "sac", []),
    team!("San Antonio", "Spurs", "SAS", "sa", []),
    team!("Toronto", "Raptors", "TOR", "tor", ["raps"]),
    team!("Utah", "Jazz", "UTA", "utah", []),
    team!("Washington", "Wizards", "WAS", "wsh", ["wiz"]),
];

pub struct TeamSource {
    rng: StdRng,
}

impl TeamSource {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl QuestionSource for TeamSource {
    async fn next_question(&mut self, round: u32) -> Result<Question, SourceError> {
        let team = TEAMS
            .choose(&mut self.rng)
            .ok_or_else(|| SourceError("Error: No teams data loaded.".into()))?;
        Ok(Question {
            prompt: Prompt::new(format!("Round {}: Who is this NBA Team?", round), colors::blue())
                .image(PromptImage::Url(team.logo_url()))
                .footer("You have 15 seconds to answer!"),
            matcher: team.matcher(),
            answer: team.full_name(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaPlayer {
    pub id: i64,
    pub name: String,
}

impl TriviaPlayer {
    pub fn headshot_url(&self) -> String {
        format!("https://cdn.nba.com/headshots/nba/latest/1040x760/{}.png", self.id)
    }

    /// Full, last or first name.
    pub fn matcher(&self) -> AnswerMatcher {
        let mut answers = vec![self.name.clone()];
        let mut words = self.name.split_whitespace();
        if let Some(first) = words.next() {
            if let Some(last) = words.last() {
                answers.push(first.to_string());
                answers.push(last.to_string());
            }
        }
        AnswerMatcher::any_of(answers)
    }
}

pub struct PlayerSource {
    players: Arc<Vec<TriviaPlayer>>,
    rng: StdRng,
}

impl PlayerSource {
    pub fn new(players: Arc<Vec<TriviaPlayer>>, rng: StdRng) -> Self {
        Self { players, rng }
    }
}

impl QuestionSource for PlayerSource {
    async fn next_question(&mut self, round: u32) -> Result<Question, SourceError> {
        let player = self
            .players
            .choose(&mut self.rng)
            .ok_or_else(|| SourceError("Error: No players data loaded.".into()))?;
        Ok(Question {
            prompt: Prompt::new(format!("Round {}: Who is this NBA Player?", round), Colour::RED)
                .image(PromptImage::Url(player.headshot_url()))
                .footer("You have 15 seconds to answer!"),
            matcher: player.matcher(),
            answer: player.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;

    use super::*;

    #[test]
    fn thirty_distinct_teams() {
        let abbreviations: HashSet<_> = TEAMS.iter().map(|t| t.abbreviation).collect();
        assert_eq!(abbreviations.len(), 30);
    }

    #[test]
    fn team_answers_include_nickname_abbreviation_and_aliases() {
        let wolves = TEAMS.iter().find(|t| t.abbreviation == "MIN").unwrap();
        let matcher = wolves.matcher();
        assert!(matcher.matches("Minnesota Timberwolves"));
        assert!(matcher.matches("timberwolves"));
        assert!(matcher.matches("min"));
        assert!(matcher.matches("T-Wolves"));
        assert!(!matcher.matches("minnesota"));
    }

    #[test]
    fn espn_codes_differ_from_abbreviations_where_needed() {
        let jazz = TEAMS.iter().find(|t| t.abbreviation == "UTA").unwrap();
        assert_eq!(jazz.logo_url(), "https://a.espncdn.com/i/teamlogos/nba/500/utah.png");
    }

    #[test]
    fn player_answers_accept_first_and_last_names() {
        let player = TriviaPlayer {
            id: 203999,
            name: "Nikola Jokić".into(),
        };
        let matcher = player.matcher();
        assert!(matcher.matches("jokic"));
        assert!(matcher.matches("Nikola"));
        assert!(matcher.matches("nikola jokic"));
        assert_eq!(
            player.headshot_url(),
            "https://cdn.nba.com/headshots/nba/latest/1040x760/203999.png"
        );
    }

    #[tokio::test]
    async fn empty_player_cache_fails_the_source() {
        let mut source = PlayerSource::new(Arc::new(vec![]), StdRng::seed_from_u64(1));
        assert!(source.next_question(1).await.is_err());
    }

    #[tokio::test]
    async fn team_question_shows_the_logo() {
        let mut source = TeamSource::new(StdRng::seed_from_u64(4));
        let question = source.next_question(3).await.unwrap();
        assert_eq!(question.prompt.title, "Round 3: Who is this NBA Team?");
        assert!(matches!(question.prompt.image, Some(PromptImage::Url(ref url)) if url.ends_with(".png")));
        assert!(question.matcher.matches(&question.answer));
    }
}
