//! Web fetcher for candidate standard updates.
//!
//! Issues one search per tracked standard name plus a fixed set of general
//! queries against a pluggable search provider. A failed query is logged
//! and skipped; it never aborts the fetch.

use std::time::Duration;

use scraper::{Html, Selector};

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// Leading slice of content checked for tracked standard names
const NAME_MATCH_WINDOW: usize = 200;

/// One raw search result.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// Candidate standard extracted from a search hit.
#[derive(Clone, Debug)]
pub struct CandidateStandard {
    pub name: String,
    pub content: String,
    pub source_url: Option<String>,
}

/// External web-search collaborator.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Search provider backed by the DuckDuckGo lite HTML endpoint.
pub struct DdgSearch {
    client: reqwest::blocking::Client,
}

impl DdgSearch {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn parse_results(body: &str, max_results: usize) -> Vec<SearchHit> {
        let document = Html::parse_document(body);
        let link_selector = Selector::parse("a.result-link").unwrap();
        let snippet_selector = Selector::parse("td.result-snippet").unwrap();

        let links = document.select(&link_selector);
        let snippets: Vec<String> = document
            .select(&snippet_selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();

        links
            .enumerate()
            .map(|(i, link)| {
                let title = link.text().collect::<String>().trim().to_string();
                let url = link.value().attr("href").unwrap_or_default().to_string();
                let content = snippets.get(i).cloned().unwrap_or_default();
                SearchHit {
                    title,
                    content,
                    url,
                }
            })
            .filter(|hit| !hit.title.is_empty())
            .take(max_results)
            .collect()
    }
}

impl SearchProvider for DdgSearch {
    fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        let response = self
            .client
            .get("https://lite.duckduckgo.com/lite/")
            .query(&[("q", query)])
            .send()?;

        if !response.status().is_success() {
            anyhow::bail!("search returned status {}", response.status());
        }

        let body = response.text()?;
        Ok(Self::parse_results(&body, max_results))
    }
}

/// Fetches candidate updates for the tracked standards.
pub struct NewsFetcher {
    provider: Box<dyn SearchProvider>,
    tracked_standards: Vec<String>,
    general_queries: Vec<String>,
    max_results: usize,
}

impl NewsFetcher {
    pub fn new(
        provider: Box<dyn SearchProvider>,
        tracked_standards: Vec<String>,
        general_queries: Vec<String>,
        max_results: usize,
    ) -> Self {
        Self {
            provider,
            tracked_standards,
            general_queries,
            max_results,
        }
    }

    /// Run every tracked-standard query plus the general queries and
    /// concatenate the results. Individual query failures are skipped.
    pub fn fetch_candidate_updates(&self) -> Vec<SearchHit> {
        let mut all_results = Vec::new();

        for standard in &self.tracked_standards {
            let query = format!("{standard} new updates changes recent standards cybersecurity");
            log::info!("searching for updates to {standard}");

            match self.provider.search(&query, self.max_results) {
                Ok(results) => all_results.extend(results),
                Err(e) => log::error!("search for '{standard}' failed: {e}"),
            }
        }

        for query in &self.general_queries {
            match self.provider.search(query, self.max_results) {
                Ok(results) => all_results.extend(results),
                Err(e) => log::error!("general search '{query}' failed: {e}"),
            }
        }

        log::info!("found a total of {} search results", all_results.len());
        all_results
    }

    /// Derive a (name, content, source_url) candidate from a raw hit.
    ///
    /// Tracked names are matched as substrings of the title or the leading
    /// content; otherwise the title (up to the first colon) becomes the
    /// name.
    pub fn extract_standard_info(&self, hit: &SearchHit) -> CandidateStandard {
        let content_head: String = hit.content.chars().take(NAME_MATCH_WINDOW).collect();

        let name = self
            .tracked_standards
            .iter()
            .find(|known| hit.title.contains(known.as_str()) || content_head.contains(known.as_str()))
            .cloned()
            .unwrap_or_else(|| match hit.title.split_once(':') {
                Some((before, _)) => before.trim().to_string(),
                None => hit.title.clone(),
            });

        CandidateStandard {
            name,
            content: hit.content.clone(),
            source_url: if hit.url.is_empty() {
                None
            } else {
                Some(hit.url.clone())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fetcher_with(provider: Box<dyn SearchProvider>) -> NewsFetcher {
        NewsFetcher::new(
            provider,
            vec!["PCI DSS".into(), "ISO 27001".into()],
            vec!["new cybersecurity standards updates".into()],
            5,
        )
    }

    struct FlakyProvider {
        calls: AtomicUsize,
    }

    impl SearchProvider for FlakyProvider {
        fn search(&self, query: &str, _max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.starts_with("PCI DSS") {
                anyhow::bail!("provider unavailable");
            }
            Ok(vec![SearchHit {
                title: format!("result for {query}"),
                content: "some content".into(),
                url: "https://example.com".into(),
            }])
        }
    }

    #[test]
    fn failed_query_is_skipped_not_fatal() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
        };
        let fetcher = fetcher_with(Box::new(provider));

        let results = fetcher.fetch_candidate_updates();

        // 2 tracked + 1 general query, one of which fails
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn extract_matches_tracked_name_in_title() {
        let fetcher = fetcher_with(Box::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        }));

        let hit = SearchHit {
            title: "Big changes coming to PCI DSS in 2026".into(),
            content: "details".into(),
            url: "https://example.com/pci".into(),
        };
        let info = fetcher.extract_standard_info(&hit);
        assert_eq!(info.name, "PCI DSS");
        assert_eq!(info.source_url.as_deref(), Some("https://example.com/pci"));
    }

    #[test]
    fn extract_matches_tracked_name_in_leading_content() {
        let fetcher = fetcher_with(Box::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        }));

        let hit = SearchHit {
            title: "Compliance news roundup".into(),
            content: "ISO 27001 revision published this week.".into(),
            url: String::new(),
        };
        let info = fetcher.extract_standard_info(&hit);
        assert_eq!(info.name, "ISO 27001");
        assert_eq!(info.source_url, None);
    }

    #[test]
    fn extract_falls_back_to_title_before_colon() {
        let fetcher = fetcher_with(Box::new(FlakyProvider {
            calls: AtomicUsize::new(0),
        }));

        let hit = SearchHit {
            title: "SOX update: what changed".into(),
            content: "no tracked names here".into(),
            url: "https://example.com".into(),
        };
        let info = fetcher.extract_standard_info(&hit);
        assert_eq!(info.name, "SOX update");

        let hit = SearchHit {
            title: "Plain title without separator".into(),
            content: "still nothing tracked".into(),
            url: "https://example.com".into(),
        };
        let info = fetcher.extract_standard_info(&hit);
        assert_eq!(info.name, "Plain title without separator");
    }

    #[test]
    fn parses_ddg_lite_markup() {
        let body = r#"
            <html><body><table>
            <tr><td><a class="result-link" href="https://example.com/a">First result</a></td></tr>
            <tr><td class="result-snippet">First snippet text</td></tr>
            <tr><td><a class="result-link" href="https://example.com/b">Second result</a></td></tr>
            <tr><td class="result-snippet">Second snippet text</td></tr>
            </table></body></html>
        "#;

        let hits = DdgSearch::parse_results(body, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "First result");
        assert_eq!(hits[0].content, "First snippet text");
        assert_eq!(hits[0].url, "https://example.com/a");
        assert_eq!(hits[1].title, "Second result");
    }

    #[test]
    fn blank_titled_links_do_not_consume_the_budget() {
        let body = r#"
            <a class="result-link" href="u1">   </a>
            <td class="result-snippet">s1</td>
            <a class="result-link" href="u2">Real one</a>
            <td class="result-snippet">s2</td>
            <a class="result-link" href="u3">Real two</a>
            <td class="result-snippet">s3</td>
        "#;

        let hits = DdgSearch::parse_results(body, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Real one");
        assert_eq!(hits[0].content, "s2");
        assert_eq!(hits[1].title, "Real two");
    }

    #[test]
    fn parse_respects_max_results() {
        let body = r#"
            <a class="result-link" href="u1">One</a>
            <td class="result-snippet">s1</td>
            <a class="result-link" href="u2">Two</a>
            <td class="result-snippet">s2</td>
            <a class="result-link" href="u3">Three</a>
            <td class="result-snippet">s3</td>
        "#;
        let hits = DdgSearch::parse_results(body, 2);
        assert_eq!(hits.len(), 2);
    }
}
