use crate::error::Error;
use reqwest::{Method, Response, Url};
use serde_json::Value;

pub mod tts;

pub type Result<T> = std::result::Result<T, Error>;

type QueryValues = Vec<(&'static str, String)>;

#[derive(Debug)]
pub enum RequestBody {
    Json(Value),
    Empty,
}

/// A single ElevenLabs REST operation.
#[allow(async_fn_in_trait)]
pub trait ElevenLabsEndpoint {
    const PATH: &'static str;

    const METHOD: Method;

    type ResponseBody;

    fn query_params(&self) -> Option<QueryValues> {
        None
    }

    fn path_params(&self) -> Vec<(&'static str, &str)> {
        vec![]
    }

    fn request_body(&self) -> Result<RequestBody> {
        Ok(RequestBody::Empty)
    }

    async fn response_body(self, resp: Response) -> Result<Self::ResponseBody>;

    fn url(&self, base_url: &str) -> Result<Url> {
        let mut url = base_url
            .parse::<Url>()
            .map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;

        let mut path = Self::PATH.to_string();

        for (placeholder, id) in self.path_params() {
            path = path.replace(placeholder, id);
        }

        url.set_path(&path);

        if let Some(query_params) = self.query_params() {
            url.query_pairs_mut().extend_pairs(query_params);
        }

        Ok(url)
    }
}
