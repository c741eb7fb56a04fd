//! In-process HTTP server and fakes shared by the crate's tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use autotrader_core::favorites::{FavoriteStatus, UserFavorites};
use autotrader_core::session::{Session, SessionUser, SharedSession};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;

use crate::error::{FavoritesError, Result};
use crate::navigation::SignInNavigator;
use crate::service::FavoritesServiceTrait;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay_ms: u64,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay_ms: 0,
        }
    }
}

type Handler = Arc<dyn Fn(&CapturedRequest) -> MockResponse + Send + Sync>;

pub struct MockServer {
    pub base_url: String,
    captured: Arc<TokioMutex<Vec<CapturedRequest>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().await.clone()
    }

    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.captured
            .lock()
            .await
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serves `responses` in order; once exhausted every request gets a 500.
pub async fn start_mock_server(responses: Vec<MockResponse>) -> MockServer {
    let scripted = Arc::new(StdMutex::new(VecDeque::from(responses)));
    start_routed_server(Arc::new(move |_request: &CapturedRequest| {
        scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockResponse::json(500, "unexpected request"))
    }))
    .await
}

pub async fn start_routed_server(handler: Handler) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let captured = Arc::new(TokioMutex::new(Vec::<CapturedRequest>::new()));
    let captured_clone = Arc::clone(&captured);

    let handle = tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(value) => value,
                Err(_) => break,
            };
            let captured_inner = Arc::clone(&captured_clone);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let Some(request) = read_http_request(&mut stream).await else {
                    return;
                };
                captured_inner.lock().await.push(request.clone());
                let response = handler(&request);
                if response.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
                }
                let _ = write_http_response(&mut stream, response.status, &response.body).await;
            });
        }
    });

    MockServer {
        base_url: format!("http://{}", addr),
        captured,
        handle,
    }
}

fn header_end_offset(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    loop {
        let mut chunk = [0_u8; 2048];
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if header_end_offset(&buffer).is_some() {
            break;
        }
    }

    let header_end = header_end_offset(&buffer)?;
    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body_read = buffer.len().saturating_sub(header_end + 4);
    while body_read < content_length {
        let mut chunk = [0_u8; 2048];
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        body_read = body_read.saturating_add(read);
    }

    Some(CapturedRequest {
        method,
        path,
        authorization: headers.get("authorization").cloned(),
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

async fn write_http_response(
    stream: &mut tokio::net::TcpStream,
    status: u16,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// Body the backend returns when Jackson trips over a lazy Hibernate proxy
/// after the transaction already committed.
pub const HIBERNATE_PROXY_ERROR_BODY: &str = r#"{"status":500,"error":"Internal Server Error","message":"Type definition error: [simple type, class org.hibernate.proxy.pojo.bytebuddy.ByteBuddyInterceptor]; nested exception is com.fasterxml.jackson.databind.exc.InvalidDefinitionException: No serializer found for class org.hibernate.proxy.pojo.bytebuddy.ByteBuddyInterceptor (through reference chain: FavoriteResponse[\"carListing\"]->CarListing$HibernateProxy$x[\"hibernateLazyInitializer\"])"}"#;

/// Scripted failure injected ahead of the fake backend's normal behavior.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Apply the write, then answer with the Hibernate serialization error.
    CommitThenHibernateError,
    /// Reject without applying.
    Respond(u16, &'static str),
}

/// Stateful favorites backend: remembers favorites and honors faults
/// queued per method.
#[derive(Default)]
pub struct FakeBackend {
    favorites: StdMutex<HashSet<String>>,
    faults: StdMutex<HashMap<String, VecDeque<Fault>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_favorite(self: Arc<Self>, listing_id: &str) -> Arc<Self> {
        self.favorites.lock().unwrap().insert(listing_id.to_string());
        self
    }

    pub fn push_fault(&self, method: &str, fault: Fault) {
        self.faults
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(fault);
    }

    pub fn is_favorite(&self, listing_id: &str) -> bool {
        self.favorites.lock().unwrap().contains(listing_id)
    }

    fn handle(&self, request: &CapturedRequest) -> MockResponse {
        if request.authorization.as_deref() != Some("Bearer valid-token") {
            return MockResponse::json(401, r#"{"message":"Unauthorized"}"#);
        }

        let fault = self
            .faults
            .lock()
            .unwrap()
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);
        if let Some(Fault::Respond(status, body)) = fault {
            return MockResponse::json(status, body);
        }

        let path = request.path.as_str();
        if let Some(id) = path.strip_prefix("/api/favorites/check/") {
            let favorite = self.is_favorite(id);
            return MockResponse::json(200, &favorite.to_string());
        }
        if path == "/api/favorites" && request.method == "GET" {
            let mut ids: Vec<String> = self.favorites.lock().unwrap().iter().cloned().collect();
            ids.sort();
            let items: Vec<String> = ids.iter().map(|id| format!(r#"{{"id":{}}}"#, id)).collect();
            return MockResponse::json(200, &format!(r#"{{"favorites":[{}]}}"#, items.join(",")));
        }
        if let Some(id) = path.strip_prefix("/api/favorites/") {
            match request.method.as_str() {
                "POST" => {
                    self.favorites.lock().unwrap().insert(id.to_string());
                }
                "DELETE" => {
                    self.favorites.lock().unwrap().remove(id);
                }
                _ => return MockResponse::json(405, "method not allowed"),
            }
            if matches!(fault, Some(Fault::CommitThenHibernateError)) {
                return MockResponse::json(500, HIBERNATE_PROXY_ERROR_BODY);
            }
            return MockResponse::json(200, r#"{"id":1}"#);
        }
        MockResponse::json(404, "not found")
    }

    pub async fn serve(self: &Arc<Self>) -> MockServer {
        let backend = Arc::clone(self);
        start_routed_server(Arc::new(move |request: &CapturedRequest| {
            backend.handle(request)
        }))
        .await
    }
}

pub fn signed_in() -> Arc<SharedSession> {
    Arc::new(SharedSession::new(Some(test_session("valid-token"))))
}

pub fn signed_out() -> Arc<SharedSession> {
    Arc::new(SharedSession::new(None))
}

pub fn test_session(token: &str) -> Session {
    Session::new(
        token,
        SessionUser {
            id: Some("user-1".to_string()),
            name: Some("Test Driver".to_string()),
            email: None,
        },
    )
}

/// Service fake with an in-memory favorites set and call counters.
#[derive(Default)]
pub struct FakeFavoritesService {
    favorites: StdMutex<HashSet<String>>,
    failures: StdMutex<VecDeque<FavoritesError>>,
    calls: StdMutex<Vec<String>>,
    delay_ms: StdMutex<u64>,
    check_delay_ms: StdMutex<u64>,
}

impl FakeFavoritesService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_favorite(&self, listing_id: &str, favorite: bool) {
        let mut favorites = self.favorites.lock().unwrap();
        if favorite {
            favorites.insert(listing_id.to_string());
        } else {
            favorites.remove(listing_id);
        }
    }

    pub fn fail_next_write(&self, err: FavoritesError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.delay_ms.lock().unwrap() = delay.as_millis() as u64;
    }

    pub fn set_check_delay(&self, delay: Duration) {
        *self.check_delay_ms.lock().unwrap() = delay.as_millis() as u64;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    async fn write(&self, call: String, listing_id: &str, favorite: bool) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay_ms.lock().unwrap();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.set_favorite(listing_id, favorite);
        Ok(())
    }
}

#[async_trait]
impl FavoritesServiceTrait for FakeFavoritesService {
    async fn add_to_favorites(&self, listing_id: &str) -> Result<()> {
        self.write(format!("add:{}", listing_id), listing_id, true).await
    }

    async fn remove_from_favorites(&self, listing_id: &str) -> Result<()> {
        self.write(format!("remove:{}", listing_id), listing_id, false).await
    }

    async fn is_favorited(&self, listing_id: &str) -> FavoriteStatus {
        self.calls.lock().unwrap().push(format!("check:{}", listing_id));
        let delay = *self.check_delay_ms.lock().unwrap();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let favorite = self.favorites.lock().unwrap().contains(listing_id);
        FavoriteStatus::new(listing_id, favorite)
    }

    async fn get_user_favorites(&self) -> Result<UserFavorites> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(UserFavorites::empty())
    }
}

/// Navigator recording redirects for a fixed current page.
pub struct RecordingNavigator {
    pub current: String,
    pub redirects: StdMutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(current: &str) -> Arc<Self> {
        Arc::new(Self {
            current: current.to_string(),
            redirects: StdMutex::new(Vec::new()),
        })
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl SignInNavigator for RecordingNavigator {
    fn current_url(&self) -> String {
        self.current.clone()
    }

    fn navigate(&self, url: &str) {
        self.redirects.lock().unwrap().push(url.to_string());
    }
}
