use serde::{Deserialize, Serialize};

pub use photo::{Photo, PhotoUrls, PhotoUser, UserLinks};
pub use search::SearchPage;

mod photo {
    use super::*;

    /// A single photo as returned by the photo API.
    ///
    /// Only `id` is required; everything else falls back to a default so that
    /// sparse records from either endpoint still decode. Unknown fields are
    /// ignored.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Photo {
        pub id: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub alt_description: Option<String>,
        #[serde(default)]
        pub width: Option<u32>,
        #[serde(default)]
        pub height: Option<u32>,
        #[serde(default)]
        pub likes: u64,
        #[serde(default)]
        pub urls: PhotoUrls,
        #[serde(default)]
        pub user: PhotoUser,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PhotoUrls {
        pub raw: Option<String>,
        pub full: Option<String>,
        pub regular: Option<String>,
        pub small: Option<String>,
        pub thumb: Option<String>,
    }

    /// Attribution metadata for a photo.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PhotoUser {
        pub name: Option<String>,
        pub username: Option<String>,
        pub portfolio_url: Option<String>,
        pub links: UserLinks,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct UserLinks {
        pub html: Option<String>,
    }

    impl Photo {
        /// Best available caption: description, then alt text, then the id.
        pub fn caption(&self) -> &str {
            [&self.description, &self.alt_description]
                .into_iter()
                .flatten()
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
                .unwrap_or(self.id.as_str())
        }

        /// The URL a grid cell should show: `small`, falling back to larger variants.
        pub fn grid_url(&self) -> Option<&str> {
            let urls = &self.urls;
            urls.small
                .as_deref()
                .or(urls.regular.as_deref())
                .or(urls.thumb.as_deref())
                .or(urls.full.as_deref())
        }

        /// Photographer name for attribution, if the API supplied one.
        pub fn attribution(&self) -> Option<&str> {
            self.user
                .name
                .as_deref()
                .or(self.user.username.as_deref())
        }
    }
}

mod search {
    use super::*;

    /// Body of the search endpoint. Only `results` is consumed; the counters
    /// are kept for logging.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct SearchPage {
        #[serde(default)]
        pub total: u64,
        #[serde(default)]
        pub total_pages: u64,
        pub results: Vec<Photo>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_photo_decodes_with_defaults() {
        let photo: Photo = serde_json::from_str(r#"{"id":"abc","extra":{"nested":true}}"#)
            .expect("valid photo json");
        assert_eq!(photo.id, "abc");
        assert_eq!(photo.likes, 0);
        assert_eq!(photo.caption(), "abc");
        assert!(photo.grid_url().is_none());
    }

    #[test]
    fn caption_prefers_non_blank_description() {
        let photo: Photo = serde_json::from_str(
            r#"{"id":"x","description":"  ","alt_description":"a cat on a mat"}"#,
        )
        .unwrap();
        assert_eq!(photo.caption(), "a cat on a mat");
    }

    #[test]
    fn grid_url_falls_back_through_variants() {
        let photo: Photo = serde_json::from_str(
            r#"{"id":"x","urls":{"regular":"https://img/regular","thumb":"https://img/thumb"}}"#,
        )
        .unwrap();
        assert_eq!(photo.grid_url(), Some("https://img/regular"));
    }

    #[test]
    fn search_page_requires_results() {
        assert!(serde_json::from_str::<SearchPage>(r#"{"total":3}"#).is_err());
        let page: SearchPage =
            serde_json::from_str(r#"{"total":1,"total_pages":1,"results":[{"id":"c1"}]}"#)
                .unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_pages, 1);
    }
}
