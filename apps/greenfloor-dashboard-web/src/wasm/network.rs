use super::*;

use async_trait::async_trait;
use js_sys::Uint8Array;
use web_sys::ReadableStreamDefaultReader;

/// `fetch` against the dashboard backend.
pub(super) struct BrowserTransport {
    base_url: String,
}

impl BrowserTransport {
    pub(super) fn new(base_url: String) -> Self {
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post_request(&self, path: &str, body: &Value) -> Result<Request, ApiError> {
        Request::post(&self.url(path)).json(body).map_err(network_error)
    }
}

fn network_error(error: gloo_net::Error) -> ApiError {
    ApiError::network(error.to_string())
}

async fn read_reply(response: Response) -> Result<RawReply, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;
    Ok(RawReply { status, body })
}

#[async_trait(?Send)]
impl HttpTransport for BrowserTransport {
    async fn get(&self, path: &str) -> Result<RawReply, ApiError> {
        let response = Request::get(&self.url(path))
            .send()
            .await
            .map_err(network_error)?;
        read_reply(response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<RawReply, ApiError> {
        let response = self
            .post_request(path, body)?
            .send()
            .await
            .map_err(network_error)?;
        read_reply(response).await
    }

    async fn post_stream(&self, path: &str, body: &Value) -> Result<ByteStream, ApiError> {
        let response = self
            .post_request(path, body)?
            .send()
            .await
            .map_err(network_error)?;
        if !response.ok() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(decode_reply::<Value>(status, &text).err().unwrap_or_else(|| {
                ApiError::backend(status, format!("stream request failed with status {status}"))
            }));
        }
        let body = response
            .body()
            .ok_or_else(|| ApiError::network("stream response has no body"))?;
        let reader = body
            .get_reader()
            .unchecked_into::<ReadableStreamDefaultReader>();

        let chunks = futures::stream::unfold(ChunkReader::new(reader), |mut chunks| async move {
            let next = chunks.next_chunk().await?;
            Some((next, chunks))
        });
        Ok(chunks.boxed_local())
    }
}

/// Pulls body chunks off a stream reader. Dropping it mid-stream cancels the body.
struct ChunkReader {
    reader: ReadableStreamDefaultReader,
    finished: bool,
}

impl ChunkReader {
    fn new(reader: ReadableStreamDefaultReader) -> Self {
        Self {
            reader,
            finished: false,
        }
    }

    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, ApiError>> {
        if self.finished {
            return None;
        }
        let read = match JsFuture::from(self.reader.read()).await {
            Ok(read) => read,
            Err(error) => {
                self.finished = true;
                return Some(Err(ApiError::network(format!("stream read failed: {error:?}"))));
            }
        };
        let done = js_sys::Reflect::get(&read, &JsValue::from_str("done"))
            .ok()
            .and_then(|done| done.as_bool())
            .unwrap_or(true);
        if done {
            self.finished = true;
            return None;
        }
        let chunk = js_sys::Reflect::get(&read, &JsValue::from_str("value"))
            .map(|value| Uint8Array::new(&value).to_vec())
            .unwrap_or_default();
        Some(Ok(chunk))
    }
}

impl Drop for ChunkReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.reader.cancel();
        }
    }
}
