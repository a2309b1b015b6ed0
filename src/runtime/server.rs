use std::{
    io::Error,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream, ToSocketAddrs},
    task::JoinHandle,
    time::{sleep, timeout},
};
use tracing::{debug, error, warn};

use crate::http::{
    request::{HttpError, RequestReader},
    response::{StatusCode, write_response},
};
use crate::runtime::handler::Handler;

/// How long an open connection may sit idle before it is closed.
const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound for reading, handling and answering one request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A running server, returned by [`serve`].
#[derive(Debug)]
pub struct Server<H: Handler> {
    server_state: Arc<ServerState<H>>,
    local_addr: SocketAddr,
    listen_task: JoinHandle<()>,
}

/// The listener, whether or not the server has been closed and the handler.
#[derive(Debug)]
struct ServerState<H: Handler> {
    listener: TcpListener,
    closed: AtomicBool,
    handler: Arc<H>,
}

/// What to do with a connection after a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connection {
    KeepAlive,
    Close,
}

impl<H: Handler> Server<H> {
    /// The address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting new connections. Connections already open finish their current request.
    pub fn close(&self) {
        self.server_state.closed.store(true, Ordering::SeqCst);
        self.listen_task.abort();
    }
}

impl<H: Handler + 'static> ServerState<H> {
    /// Accepts connections until the server is closed, each served on its own task.
    async fn listen(self: Arc<Self>) {
        loop {
            let accepted = self.listener.accept().await;
            if self.closed.load(Ordering::SeqCst) {
                debug!("server closed, no longer accepting connections");
                return;
            }
            match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    let handler = Arc::clone(&self.handler);
                    tokio::spawn(async move {
                        if let Err(error) = handle(stream, handler.as_ref()).await {
                            warn!(%peer, %error, "connection ended with an error");
                        }
                    });
                }
                Err(error) => {
                    warn!(%error, "failed to accept connection");
                    sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }
}

/// Binds `addr` and serves every accepted connection with `handler` on a background task.
///
/// # Errors
///
/// Returns an error if binding the tcp listener fails.
pub async fn serve<A, H>(addr: A, handler: Arc<H>) -> Result<Server<H>, Error>
where
    A: ToSocketAddrs,
    H: Handler + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let server_state = Arc::new(ServerState {
        listener,
        closed: AtomicBool::new(false),
        handler,
    });
    let listen_task = tokio::spawn(Arc::clone(&server_state).listen());
    Ok(Server {
        server_state,
        local_addr,
        listen_task,
    })
}

/// Serves requests on one connection until it is closed.
///
/// # Errors
///
/// Returns an `HttpError` if reading from or writing to the stream fails.
async fn handle<H: Handler>(mut stream: TcpStream, handler: &H) -> Result<(), HttpError> {
    let (reader, mut writer) = stream.split();
    let mut requests = RequestReader::new(reader);
    loop {
        match timeout(REQUEST_TIMEOUT, process_request(&mut requests, &mut writer, handler)).await {
            Ok(Ok(Connection::KeepAlive)) => {}
            Ok(Ok(Connection::Close)) => return Ok(()),
            Ok(Err(error)) => return Err(error),
            Err(_elapsed) => {
                let response = handler.reject(StatusCode::GatewayTimeout, "Gateway Timeout");
                write_response(&mut writer, &response).await?;
                return Ok(());
            }
        }
    }
}

/// Reads one request from the connection and writes the handler's answer.
///
/// # Errors
///
/// Returns an `HttpError` if the stream fails. Malformed requests are answered, not returned.
async fn process_request<R, W, H>(
    requests: &mut RequestReader<R>,
    writer: &mut W,
    handler: &H,
) -> Result<Connection, HttpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    H: Handler,
{
    let request = match timeout(KEEP_ALIVE_TIMEOUT, requests.next_request()).await {
        Ok(Ok(request)) => request,
        Err(_) | Ok(Err(HttpError::UnexpectedEOF)) => return Ok(Connection::Close),
        Ok(Err(HttpError::Io(error))) => return Err(HttpError::Io(error)),
        Ok(Err(error)) => {
            let (status, message) = match &error {
                HttpError::PayloadTooLarge(_) => (StatusCode::PayloadTooLarge, "Payload Too Large"),
                HttpError::UnsupportedTransferEncoding(_) => (StatusCode::NotImplemented, "Not Implemented"),
                _ => (StatusCode::BadRequest, "Bad Request"),
            };
            warn!(%error, status = status.as_u16(), "rejecting request");
            write_response(writer, &handler.reject(status, message)).await?;
            return Ok(Connection::Close);
        }
    };

    let keep_alive = !request.wants_close();
    let mut response = match handler.call(&request).await {
        Ok(response) => response,
        Err(error) => {
            error!(error = ?error, method = request.method(), "handler failed");
            handler.reject(StatusCode::InternalServerError, &format!("Server error: {error}"))
        }
    };

    if !keep_alive {
        response.headers.insert("connection", "close");
    }
    write_response(writer, &response).await?;

    if keep_alive && response.headers.get("connection") != Some("close") {
        Ok(Connection::KeepAlive)
    } else {
        Ok(Connection::Close)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use reqwest::Client;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        time::timeout,
    };

    use crate::{
        http::{
            request::{HttpError, Request},
            response::{Response, StatusCode, text_response},
        },
        runtime::{handler::Handler, server::serve},
    };

    #[derive(Debug)]
    struct MyHandler;

    impl Handler for MyHandler {
        async fn call(&self, request: &Request) -> Result<Response, HttpError> {
            match request.path().as_str() {
                "/yourproblem" => Ok(text_response(StatusCode::BadRequest, "Bad Request")),
                "/myproblem" => Err(HttpError::InternalInvariantViolated),
                _ => Ok(text_response(StatusCode::Ok, "All good!")),
            }
        }

        fn reject(&self, status: StatusCode, message: &str) -> Response {
            let mut response = text_response(status, message);
            response.headers.insert("x-rejected-by", "my-handler");
            response
        }
    }

    fn client() -> Client {
        Client::builder().timeout(Duration::from_secs(5)).build().unwrap()
    }

    async fn read_until(stream: &mut TcpStream, suffix: &str) -> String {
        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        while !received.ends_with(suffix.as_bytes()) {
            let read = stream.read(&mut buf).await.unwrap();
            assert!(read > 0, "connection closed early: {}", String::from_utf8_lossy(&received));
            received.extend_from_slice(&buf[..read]);
        }
        String::from_utf8(received).unwrap()
    }

    #[tokio::test]
    async fn server_can_establish_connection() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let url = format!("http://{}/test", server.local_addr());

        let resp = timeout(Duration::from_secs(10), client().get(&url).send())
            .await
            .expect("Test timed out")
            .expect("Request failed");

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "All good!");
        server.close();
    }

    #[tokio::test]
    async fn endpoints_write_correct_response() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let url = format!("http://{}/yourproblem", server.local_addr());

        let resp = client().get(&url).send().await.expect("Request failed");

        assert_eq!(resp.status().as_u16(), 400);
        server.close();
    }

    #[tokio::test]
    async fn handler_error_is_answered_with_internal_server_error() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let url = format!("http://{}/myproblem", server.local_addr());

        let resp = client().get(&url).send().await.expect("Request failed");

        assert_eq!(resp.status().as_u16(), 500);
        assert_eq!(resp.headers()["x-rejected-by"], "my-handler");
        assert_eq!(resp.text().await.unwrap(), "Server error: Internal invariant violated");
        server.close();
    }

    #[tokio::test]
    async fn malformed_request_is_rejected_and_closed() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();

        stream.write_all(b"GARBAGE\r\n\r\n").await.unwrap();
        let mut answer = String::new();
        stream.read_to_string(&mut answer).await.unwrap();

        assert!(answer.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(answer.contains("x-rejected-by: my-handler\r\n"));
        server.close();
    }

    #[tokio::test]
    async fn keep_alive_connection_serves_several_requests() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();

        stream.write_all(b"GET /one HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let first = read_until(&mut stream, "All good!").await;
        assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));

        stream
            .write_all(b"GET /two HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut second = String::new();
        stream.read_to_string(&mut second).await.unwrap();
        assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(second.contains("connection: close\r\n"));
        server.close();
    }

    #[tokio::test]
    async fn pipelined_requests_are_answered_in_order() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();

        stream
            .write_all(
                b"GET /one HTTP/1.1\r\nHost: localhost\r\n\r\n\
                  GET /yourproblem HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        let mut answer = String::new();
        timeout(Duration::from_secs(5), stream.read_to_string(&mut answer))
            .await
            .expect("connection was not closed")
            .unwrap();

        let ok = answer.find("HTTP/1.1 200 OK\r\n").expect("first response missing");
        let bad = answer.find("HTTP/1.1 400 Bad Request\r\n").expect("second response missing");
        assert!(ok < bad);
        server.close();
    }

    #[tokio::test]
    async fn unsupported_transfer_coding_is_not_implemented() {
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();

        stream
            .write_all(b"POST /test HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: gzip\r\n\r\n")
            .await
            .unwrap();
        let mut answer = String::new();
        stream.read_to_string(&mut answer).await.unwrap();

        assert!(answer.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(answer.contains("x-rejected-by: my-handler\r\n"));
        server.close();
    }

    #[tokio::test]
    async fn server_works_concurrently() {
        const CONCURRENT_REQUESTS: usize = 20;
        let server = serve("127.0.0.1:0", Arc::new(MyHandler)).await.expect("Failed to start server");
        let base_url = format!("http://{}", server.local_addr());
        let client = client();

        let tasks: Vec<_> = (0..CONCURRENT_REQUESTS)
            .map(|i| {
                let client = client.clone();
                let url = format!("{base_url}/test/{i}");
                tokio::spawn(async move {
                    let resp = client.get(&url).send().await.expect("Request failed");
                    resp.status()
                })
            })
            .collect();

        for status in futures::future::join_all(tasks).await {
            assert!(status.unwrap().is_success());
        }
        server.close();
    }
}
