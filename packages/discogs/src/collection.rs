//! Paced, paginated fetch of a user's Discogs collection.

use crate_digger_collection_models::RecordEntry;
use crate_digger_discogs_models::{
    ArtistCredit, BasicInformation, CollectionPage, OAuthSessionState, TokenPair,
};
use crate_digger_normalize::{RawRecord, clean_artist_name, normalize_record};

use crate::pacing::Pacer;
use crate::signing::percent_encode;
use crate::transport::Method;
use crate::{DiscogsClient, DiscogsError};

/// The "All" folder, which contains every release in a collection.
const ALL_FOLDER: u32 = 0;

impl DiscogsClient {
    /// Fetches every release in the authenticated user's collection.
    ///
    /// Pages are requested one at a time, no closer together than the
    /// configured minimum interval. The username stored in `state` is used
    /// when present; otherwise it is resolved through the identity endpoint
    /// first and stored back into `state`.
    ///
    /// # Errors
    ///
    /// * [`DiscogsError::AuthRequired`] if `state` has no access token.
    /// * [`DiscogsError::Fetch`] if any request fails or returns a body
    ///   that cannot be decoded. Releases from earlier pages are discarded.
    pub async fn fetch_collection(
        &self,
        state: &mut OAuthSessionState,
    ) -> Result<Vec<RecordEntry>, DiscogsError> {
        let access_token = state
            .access_token()
            .ok_or(DiscogsError::AuthRequired)?
            .clone();
        let mut pacer = Pacer::new(self.clock.as_ref(), self.config.min_request_interval);

        let username = if let Some(username) = state.username() {
            username.to_owned()
        } else {
            pacer.wait().await;
            let username = self
                .identity(&access_token)
                .await
                .map_err(|message| DiscogsError::Fetch {
                    message: format!("failed to resolve username: {message}"),
                })?
                .username;
            state.set_username(username.clone());
            username
        };

        log::info!("Fetching Discogs collection for {username}");

        let mut entries = Vec::new();
        let mut page = 1u32;

        loop {
            if page > self.config.max_pages {
                log::warn!(
                    "Stopping Discogs fetch for {username} after {} pages ({} entries)",
                    self.config.max_pages,
                    entries.len()
                );
                break;
            }

            pacer.wait().await;
            let collection_page = self.fetch_page(&access_token, &username, page).await?;
            let pagination = &collection_page.pagination;

            log::debug!(
                "Fetched collection page {}/{} ({} releases, {} items total)",
                pagination.page,
                pagination.pages,
                collection_page.releases.len(),
                pagination.items
            );

            entries.extend(
                collection_page
                    .releases
                    .iter()
                    .filter_map(|release| normalize_record(&release_to_raw(&release.basic_information))),
            );

            if pagination.urls.next.is_none() || page >= pagination.pages {
                break;
            }

            page += 1;
        }

        log::info!(
            "Fetched {} entries from the Discogs collection of {username}",
            entries.len()
        );

        Ok(entries)
    }

    async fn fetch_page(
        &self,
        access_token: &TokenPair,
        username: &str,
        page: u32,
    ) -> Result<CollectionPage, DiscogsError> {
        let url = format!(
            "{}/users/{}/collection/folders/{ALL_FOLDER}/releases?page={page}&per_page={}",
            self.config.api_base,
            percent_encode(username),
            self.config.per_page,
        );

        let body = self
            .send_signed(Method::Get, &url, Some(access_token), &[])
            .await
            .map_err(|message| DiscogsError::Fetch {
                message: format!("page {page}: {message}"),
            })?;

        serde_json::from_str(&body).map_err(|e| DiscogsError::Fetch {
            message: format!("page {page}: malformed collection response: {e}"),
        })
    }
}

/// Flattens a release's metadata into the shared raw record shape.
///
/// * Artist credits are joined with their join phrases, each name cleaned
///   of Discogs suffixes. A name variation (`anv`) is preferred.
/// * Genres are joined with `", "`; styles are used when there are none.
/// * Only the first label is kept.
/// * Each format becomes `"Name, desc, desc"`; several are joined with
///   `" + "`.
#[must_use]
pub fn release_to_raw(info: &BasicInformation) -> RawRecord {
    let genres = if info.genres.is_empty() {
        &info.styles
    } else {
        &info.genres
    };

    RawRecord {
        artist: join_artists(&info.artists),
        title: info.title.clone(),
        year: info.year.map(|y| y.to_string()).unwrap_or_default(),
        genre: genres.join(", "),
        label: info
            .labels
            .first()
            .map(|label| label.name.clone())
            .unwrap_or_default(),
        format: info
            .formats
            .iter()
            .map(|format| {
                std::iter::once(format.name.as_str())
                    .chain(format.descriptions.iter().map(String::as_str))
                    .filter(|part| !part.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|format| !format.is_empty())
            .collect::<Vec<_>>()
            .join(" + "),
    }
}

fn join_artists(credits: &[ArtistCredit]) -> String {
    let mut joined = String::new();

    for (i, credit) in credits.iter().enumerate() {
        let name = if credit.anv.trim().is_empty() {
            &credit.name
        } else {
            &credit.anv
        };
        joined.push_str(&clean_artist_name(name));

        let join = credit.join.trim();
        if i + 1 < credits.len() {
            match join {
                "" | "," => joined.push_str(", "),
                _ => {
                    joined.push(' ');
                    joined.push_str(join);
                    joined.push(' ');
                }
            }
        }
    }

    joined
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate_digger_discogs_models::{LabelCredit, ReleaseFormat};
    use serde_json::json;

    use super::*;
    use crate::testing;

    fn authenticated(username: Option<&str>) -> OAuthSessionState {
        let mut state = OAuthSessionState::default();
        state.complete(
            TokenPair::new("acc", "acc-secret"),
            username.map(ToOwned::to_owned),
        );
        state
    }

    fn page_body(page: u32, pages: u32, per_page: u32, items: u32) -> String {
        let releases: Vec<_> = (0..per_page)
            .map(|i| {
                let n = (page - 1) * per_page + i;
                json!({
                    "id": n,
                    "basic_information": {
                        "title": format!("Album {n}"),
                        "year": 1990 + (n % 30),
                        "artists": [{ "name": format!("Artist {n}"), "anv": "", "join": "" }],
                        "labels": [{ "name": "Warp", "catno": "WARP1" }],
                        "formats": [{ "name": "Vinyl", "qty": "1", "descriptions": ["LP"] }],
                        "genres": ["Electronic"],
                        "styles": ["IDM"]
                    }
                })
            })
            .collect();
        let next = (page < pages).then(|| format!("https://api.discogs.com/next?page={}", page + 1));
        json!({
            "pagination": {
                "page": page, "pages": pages, "per_page": per_page, "items": items,
                "urls": { "next": next }
            },
            "releases": releases
        })
        .to_string()
    }

    #[tokio::test]
    async fn requires_access_token() {
        let (client, transport, _clock) = testing::client();
        let err = client
            .fetch_collection(&mut OAuthSessionState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscogsError::AuthRequired));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn two_pages_of_fifty() {
        let (client, transport, _clock) = testing::client();
        transport.respond(200, page_body(1, 2, 50, 100));
        transport.respond(200, page_body(2, 2, 50, 100));

        let entries = client
            .fetch_collection(&mut authenticated(Some("digger")))
            .await
            .unwrap();

        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0].title(), "Album 0");
        assert_eq!(entries[99].title(), "Album 99");
        assert_eq!(entries[0].format(), "Vinyl, LP");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].1.url.ends_with(
            "/users/digger/collection/folders/0/releases?page=1&per_page=100"
        ));
        assert!(requests[1].1.url.contains("page=2"));
    }

    #[tokio::test]
    async fn requests_are_at_least_250ms_apart() {
        let (client, transport, _clock) = testing::client();
        for page in 1..=5 {
            transport.respond(200, page_body(page, 5, 3, 15));
        }

        let entries = client
            .fetch_collection(&mut authenticated(Some("digger")))
            .await
            .unwrap();
        assert_eq!(entries.len(), 15);

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        for pair in requests.windows(2) {
            let gap = pair[1].0 - pair[0].0;
            assert!(gap >= Duration::from_millis(250), "gap was {gap:?}");
        }
    }

    #[tokio::test]
    async fn resolves_username_when_unknown() {
        let (client, transport, _clock) = testing::client();
        transport.respond(200, r#"{"id": 7, "username": "crate digger"}"#);
        transport.respond(200, page_body(1, 1, 2, 2));

        let mut state = authenticated(None);
        let entries = client.fetch_collection(&mut state).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(state.username(), Some("crate digger"));

        let requests = transport.requests();
        assert!(requests[0].1.url.ends_with("/oauth/identity"));
        assert!(requests[1].1.url.contains("/users/crate%20digger/collection/"));
        assert!(requests[1].0 - requests[0].0 >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn failing_page_discards_partial_results() {
        let (client, transport, _clock) = testing::client();
        transport.respond(200, page_body(1, 3, 10, 30));
        transport.respond(502, "Bad Gateway");

        let err = client
            .fetch_collection(&mut authenticated(Some("digger")))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscogsError::Fetch { ref message } if message.contains("page 2")));
    }

    #[tokio::test]
    async fn malformed_page_is_a_fetch_error() {
        let (client, transport, _clock) = testing::client();
        transport.respond(200, "<html>maintenance</html>");
        let err = client
            .fetch_collection(&mut authenticated(Some("digger")))
            .await
            .unwrap_err();
        assert!(matches!(err, DiscogsError::Fetch { .. }));
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let (mut client, transport, _clock) = testing::client();
        client.config.max_pages = 2;
        for page in 1..=3 {
            transport.respond(200, page_body(page, 3, 1, 3));
        }
        let entries = client
            .fetch_collection(&mut authenticated(Some("digger")))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn maps_release_metadata() {
        let info = BasicInformation {
            title: "Fear of Music".to_owned(),
            year: Some(0),
            artists: vec![
                ArtistCredit {
                    name: "Brian Eno".to_owned(),
                    anv: String::new(),
                    join: "&".to_owned(),
                },
                ArtistCredit {
                    name: "David Byrne (2)".to_owned(),
                    anv: String::new(),
                    join: String::new(),
                },
            ],
            labels: vec![
                LabelCredit {
                    name: "Sire".to_owned(),
                    catno: "SRK 6076".to_owned(),
                },
                LabelCredit {
                    name: "Warner".to_owned(),
                    catno: String::new(),
                },
            ],
            formats: vec![
                ReleaseFormat {
                    name: "Vinyl".to_owned(),
                    qty: "1".to_owned(),
                    descriptions: vec!["LP".to_owned(), "Album".to_owned()],
                },
                ReleaseFormat {
                    name: "CD".to_owned(),
                    qty: "1".to_owned(),
                    descriptions: vec![],
                },
            ],
            genres: vec![],
            styles: vec!["New Wave".to_owned(), "Art Rock".to_owned()],
        };

        let entry = normalize_record(&release_to_raw(&info)).unwrap();
        assert_eq!(entry.artist(), "Brian Eno & David Byrne");
        assert_eq!(entry.year(), "");
        assert_eq!(entry.genre(), "New Wave, Art Rock");
        assert_eq!(entry.label(), "Sire");
        assert_eq!(entry.format(), "Vinyl, LP, Album + CD");
    }

    #[test]
    fn prefers_name_variation() {
        let credits = [
            ArtistCredit {
                name: "Prince".to_owned(),
                anv: "The Artist*".to_owned(),
                join: ",".to_owned(),
            },
            ArtistCredit {
                name: "The Revolution".to_owned(),
                anv: String::new(),
                join: String::new(),
            },
        ];
        assert_eq!(join_artists(&credits), "The Artist, The Revolution");
    }

    #[test]
    fn release_without_artist_is_dropped() {
        let info = BasicInformation {
            title: "Untitled".to_owned(),
            ..BasicInformation::default()
        };
        assert!(normalize_record(&release_to_raw(&info)).is_none());
    }
}
