//! Raw TCP server that goes silent part way through a response.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Starts a server that reads each request, writes `head`, then never
/// sends anything else. Returns its base URL.
pub async fn stalling_server(head: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0_u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(head).await;
                std::future::pending::<()>().await;
            });
        }
    });

    format!("http://{addr}")
}
