/*!

F1 driver quiz: a driver's photo is shown and the channel names the driver.

Photos come from Wikipedia. A driver is searched under a few title variants, the first hit's page image is requested at
1000 px, and the download is only accepted when it is large enough to be a real photo.

*/

use std::{collections::HashMap, future::Future, path::Path, sync::Arc, time::Duration};

use rand::{rngs::StdRng, seq::IndexedRandom};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::{
    games::{
        answers::AnswerMatcher,
        round::{Prompt, PromptImage},
        trivia::{Question, QuestionSource, SourceError, TriviaRules},
    },
    infrastructure::{
        colors,
        http::{FetchError, require_success},
    },
};

pub const DRIVERS_FILE: &str = "f1_drivers.json";
const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const THUMBNAIL_SIZE: &str = "1000";
const MIN_IMAGE_BYTES: usize = 5000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DRIVER_ATTEMPTS: usize = 20;

pub const RULES: TriviaRules = TriviaRules {
    max_rounds: 30,
    winning_score: 10,
    answer_timeout: Duration::from_secs(15),
    pause: Duration::from_secs(2),
};

const BUILTIN_DRIVERS: &[&str] = &[
    "Lewis Hamilton",
    "Max Verstappen",
    "Fernando Alonso",
    "Sebastian Vettel",
    "Kimi Räikkönen",
    "Michael Schumacher",
    "Ayrton Senna",
    "Alain Prost",
    "Niki Lauda",
    "Nico Rosberg",
    "Jenson Button",
    "Charles Leclerc",
    "Lando Norris",
    "Carlos Sainz Jr.",
    "George Russell",
    "Sergio Pérez",
    "Daniel Ricciardo",
    "Valtteri Bottas",
    "Oscar Piastri",
    "Pierre Gasly",
    "Esteban Ocon",
    "Lance Stroll",
    "Nico Hülkenberg",
    "Kevin Magnussen",
    "Yuki Tsunoda",
    "Alexander Albon",
    "Mika Häkkinen",
    "Nigel Mansell",
    "Damon Hill",
    "Jacques Villeneuve",
    "Mark Webber",
    "Felipe Massa",
    "Rubens Barrichello",
    "Jackie Stewart",
    "Juan Manuel Fangio",
];

/// Loads the driver list from `DATA_DIRECTORY/f1_drivers.json` (a JSON array of names), falling back to the built-in
/// list when the file is missing, unreadable or empty.
pub fn load_drivers(data_directory: &Path) -> Vec<String> {
    let path = data_directory.join(DRIVERS_FILE);
    let loaded = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|contents| serde_json::from_str::<Vec<String>>(&contents).map_err(|e| e.to_string()));

    match loaded {
        Ok(drivers) if !drivers.is_empty() => {
            info!("Loaded {} F1 drivers from {}", drivers.len(), path.display());
            drivers
        }
        Ok(_) => {
            warn!("{} lists no drivers, using the built-in list", path.display());
            builtin_drivers()
        }
        Err(e) => {
            debug!("Using the built-in F1 driver list ({}: {})", path.display(), e);
            builtin_drivers()
        }
    }
}

fn builtin_drivers() -> Vec<String> {
    BUILTIN_DRIVERS.iter().map(|s| s.to_string()).collect()
}

/// Full name, or the last word of it.
pub fn driver_matcher(driver: &str) -> AnswerMatcher {
    let mut aliases = vec![driver.to_string()];
    let words: Vec<&str> = driver.split_whitespace().collect();
    if words.len() > 1 {
        // "Carlos Sainz Jr." answers to "sainz".
        let last = words
            .iter()
            .rev()
            .find(|w| !matches!(w.to_lowercase().as_str(), "jr." | "jr" | "sr." | "sr"))
            .copied();
        if let Some(last) = last {
            aliases.push(last.to_string());
        }
    }
    AnswerMatcher::any_of(aliases)
}

pub fn search_queries(driver: &str) -> [String; 4] {
    let clean = driver.replace("(racing driver)", "").trim().to_string();
    [
        format!("{} (racing driver)", clean),
        format!("{} (Formula One driver)", clean),
        format!("{} F1 driver", clean),
        clean,
    ]
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageImagesResponse {
    query: Option<PageImagesQuery>,
}

#[derive(Debug, Deserialize)]
struct PageImagesQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}

/// Finds photos of drivers.
pub trait DriverImages: Send + Sync {
    fn driver_image(&self, driver: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

#[derive(Clone)]
pub struct WikipediaImages {
    client: Client,
}

impl WikipediaImages {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn first_title(&self, query: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(WIKIPEDIA_API)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
                ("srlimit", "1"),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let body: SearchResponse = require_success(response)?.json().await?;
        Ok(body
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title))
    }

    async fn thumbnail_url(&self, title: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(WIKIPEDIA_API)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "pageimages"),
                ("format", "json"),
                ("pithumbsize", THUMBNAIL_SIZE),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let body: PageImagesResponse = require_success(response)?.json().await?;
        Ok(body
            .query
            .into_iter()
            .flat_map(|q| q.pages.into_values())
            .find_map(|page| page.thumbnail.map(|t| t.source)))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).timeout(REQUEST_TIMEOUT).send().await?;
        let bytes = require_success(response)?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn try_query(&self, query: &str) -> Result<Option<Vec<u8>>, FetchError> {
        let Some(title) = self.first_title(query).await? else {
            return Ok(None);
        };
        let Some(url) = self.thumbnail_url(&title).await? else {
            return Ok(None);
        };
        let data = self.download(&url).await?;
        if data.len() > MIN_IMAGE_BYTES {
            Ok(Some(data))
        } else {
            trace!(url, size = data.len(), "Image too small");
            Ok(None)
        }
    }
}

impl DriverImages for WikipediaImages {
    async fn driver_image(&self, driver: &str) -> Option<Vec<u8>> {
        for query in search_queries(driver) {
            match self.try_query(&query).await {
                Ok(Some(data)) => return Some(data),
                Ok(None) => trace!(query, "No usable image"),
                Err(e) => debug!(query, "Image lookup failed: {}", e),
            }
        }
        None
    }
}

/// Picks random drivers until one has a photo.
pub struct F1DriverSource<I> {
    images: I,
    drivers: Arc<Vec<String>>,
    rng: StdRng,
}

impl<I: DriverImages> F1DriverSource<I> {
    pub fn new(images: I, drivers: Arc<Vec<String>>, rng: StdRng) -> Self {
        Self { images, drivers, rng }
    }

    fn random_driver(&mut self) -> Option<String> {
        self.drivers.choose(&mut self.rng).cloned()
    }
}

impl<I: DriverImages> QuestionSource for F1DriverSource<I> {
    async fn next_question(&mut self, round: u32) -> Result<Question, SourceError> {
        for _ in 0..DRIVER_ATTEMPTS {
            let Some(driver) = self.random_driver() else {
                break;
            };
            if let Some(data) = self.images.driver_image(&driver).await {
                return Ok(Question {
                    prompt: Prompt::new(
                        format!("Round {}/{}: Who is this F1 Driver?", round, RULES.max_rounds),
                        colors::red(),
                    )
                    .image(PromptImage::Bytes {
                        filename: "driver.jpg".into(),
                        data,
                    })
                    .footer("Type the full name or last name!"),
                    matcher: driver_matcher(&driver),
                    answer: driver,
                });
            }
        }
        Err(SourceError(
            "Internal Error: Could not load images. Please check bot connection.".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::SeedableRng;

    use super::*;

    struct FakeImages {
        available: Vec<&'static str>,
        lookups: AtomicUsize,
    }

    impl DriverImages for FakeImages {
        async fn driver_image(&self, driver: &str) -> Option<Vec<u8>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.available
                .contains(&driver)
                .then(|| vec![0u8; MIN_IMAGE_BYTES + 1])
        }
    }

    fn drivers(names: &[&str]) -> Arc<Vec<String>> {
        Arc::new(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn accepts_full_and_last_names() {
        let matcher = driver_matcher("Kimi Räikkönen");
        assert!(matcher.matches("kimi raikkonen"));
        assert!(matcher.matches("Räikkönen"));
        assert!(!matcher.matches("kimi"));

        let matcher = driver_matcher("Carlos Sainz Jr.");
        assert!(matcher.matches("sainz"));
    }

    #[test]
    fn search_variants_strip_the_disambiguation() {
        let queries = search_queries("Jack Brabham (racing driver)");
        assert_eq!(queries[0], "Jack Brabham (racing driver)");
        assert_eq!(queries[3], "Jack Brabham");
    }

    #[test]
    fn parses_wikipedia_page_images() {
        let body = r#"{"query":{"pages":{"123":{"pageid":123,"thumbnail":{"source":"https://upload/x.jpg","width":1000}}}}}"#;
        let parsed: PageImagesResponse = serde_json::from_str(body).unwrap();
        let source = parsed
            .query
            .unwrap()
            .pages
            .into_values()
            .find_map(|p| p.thumbnail.map(|t| t.source));
        assert_eq!(source.as_deref(), Some("https://upload/x.jpg"));
    }

    #[test]
    fn missing_drivers_file_uses_builtin_list() {
        let drivers = load_drivers(Path::new("/nonexistent/courtside"));
        assert!(drivers.len() >= 20);
    }

    #[tokio::test]
    async fn source_skips_drivers_without_photos() {
        let images = FakeImages {
            available: vec!["Lando Norris"],
            lookups: AtomicUsize::new(0),
        };
        let mut source = F1DriverSource::new(
            images,
            drivers(&["Nobody Known", "Lando Norris"]),
            StdRng::seed_from_u64(3),
        );

        let question = source.next_question(1).await.unwrap();
        assert_eq!(question.answer, "Lando Norris");
        assert!(question.matcher.matches("norris"));
        assert!(matches!(question.prompt.image, Some(PromptImage::Bytes { .. })));
    }

    #[tokio::test]
    async fn gives_up_after_twenty_attempts() {
        let images = FakeImages {
            available: vec![],
            lookups: AtomicUsize::new(0),
        };
        let mut source = F1DriverSource::new(images, drivers(&["Nobody Known"]), StdRng::seed_from_u64(3));

        assert!(source.next_question(1).await.is_err());
        assert_eq!(source.images.lookups.load(Ordering::SeqCst), DRIVER_ATTEMPTS);
    }
}
