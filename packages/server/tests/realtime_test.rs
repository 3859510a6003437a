//! In-process integration tests: a real server on an ephemeral port, driven
//! by real WebSocket and HTTP clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use between_server::ui::{Server, state::AppState};
use between_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message, client::IntoClientRequest, http::HeaderValue},
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper struct to manage an in-process server's lifecycle
struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server on an ephemeral port
    async fn start(name: &str) -> Self {
        let gardens_dir = std::env::temp_dir().join(format!("between-none-{}", name));
        let server = Server::new(AppState::new(
            name.to_string(),
            gardens_dir,
            Arc::new(SystemClock),
        ));
        let state = server.state().clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.await;
            };
            server.serve(listener, signal).await.unwrap();
        });

        TestServer {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self, path: &str) -> Socket {
        let (socket, _) = connect_async(self.ws_url(path)).await.unwrap();
        socket
    }

    async fn get_json(&self, path: &str) -> Value {
        reqwest::get(self.http_url(path))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Poll `path` until `predicate` holds
    async fn wait_for_json<F>(&self, path: &str, predicate: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        for _ in 0..100 {
            let body = self.get_json(path).await;
            if predicate(&body) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never reached the expected state", path);
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Next text frame, as JSON
async fn recv_json(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Skip frames until one of type `kind` arrives
async fn recv_of_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let frame = recv_json(socket).await;
        if frame["type"] == kind {
            return frame;
        }
    }
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_and_unknown_path() {
    // テスト項目: ヘルスチェックは ok を返し、未知のパスは 404 になる
    // given (前提条件):
    let server = TestServer::start("health").await;

    // when (操作):
    let health = server.get_json("/api/health").await;
    let unknown = reqwest::get(server.http_url("/garden")).await.unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_presence_counts_follow_joins_and_leaves() {
    // テスト項目: 2 人目の参加で両者に 2 が届き、片方の退出で残りに 1 が届く
    // given (前提条件):
    let server = TestServer::start("presence").await;
    let mut a = server.connect("/presence?space=clearing").await;
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "presence", "space": "clearing", "count": 1})
    );

    // when (操作):
    let mut b = server.connect("/presence?space=clearing").await;

    // then (期待する結果):
    assert_eq!(recv_json(&mut a).await["count"], 2);
    assert_eq!(recv_json(&mut b).await["count"], 2);
    server
        .wait_for_json("/api/presence", |p| p["clearing"] == 2)
        .await;

    // when (操作):
    b.close(None).await.unwrap();

    // then (期待する結果):
    assert_eq!(recv_json(&mut a).await["count"], 1);
    let presence = server
        .wait_for_json("/api/presence", |p| p["clearing"] == 1)
        .await;
    assert_eq!(presence["total"], 1);
    assert_eq!(presence["sanctuary"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_space_is_rejected() {
    // テスト項目: 不正なスペース名での接続は 400 で拒否される
    // given (前提条件):
    let server = TestServer::start("invalid-space").await;

    // when (操作):
    let result = connect_async(server.ws_url("/presence?space=Not%20Valid")).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 400),
        other => panic!("expected an HTTP 400, got {:?}", other.map(|_| ())),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_edge_stroke_reaches_everyone_and_is_replayed() {
    // テスト項目: 線は送信者を含む全員に届き、後から来た人には再送される
    // given (前提条件):
    let server = TestServer::start("edge").await;
    let mut a = server.connect("/edge-ws").await;
    assert_eq!(recv_json(&mut a).await, json!({"type": "strokes", "strokes": []}));
    let mut b = server.connect("/edge-ws").await;
    recv_of_type(&mut b, "strokes").await;

    // when (操作):
    send_json(
        &mut a,
        json!({"type": "stroke", "points": [{"x": 0.1, "y": 0.2}, {"x": 0.3, "y": 0.4}]}),
    )
    .await;

    // then (期待する結果):
    let to_a = recv_of_type(&mut a, "stroke").await;
    let to_b = recv_of_type(&mut b, "stroke").await;
    assert_eq!(to_a, to_b);
    assert_eq!(to_a["stroke"]["points"].as_array().unwrap().len(), 2);

    let mut c = server.connect("/edge-ws").await;
    let replay = recv_of_type(&mut c, "strokes").await;
    assert_eq!(replay["strokes"][0]["id"], to_a["stroke"]["id"]);

    server.stop().await;
}

#[tokio::test]
async fn test_weave_cursor_and_fragment_over_a_socket() {
    // テスト項目: weave で識別情報が届き、不正なフレームは無視され、カーソルと言葉が全員に届く
    // given (前提条件):
    let server = TestServer::start("weave").await;
    let mut a = server.connect("/weave-ws").await;
    assert_eq!(
        recv_json(&mut a).await,
        json!({"type": "fragments", "fragments": []})
    );
    let welcome = recv_json(&mut a).await;
    assert_eq!(welcome["type"], "welcome");
    let roster = recv_json(&mut a).await;
    assert_eq!(roster["type"], "cursors");
    assert_eq!(roster["count"], 1);

    // when (操作): 不正なフレームの直後に正しいカーソル移動を送る
    a.send(Message::Text("not json".into())).await.unwrap();
    send_json(&mut a, json!({"type": "cursor", "x": "left", "y": 0.5})).await;
    send_json(&mut a, json!({"type": "cursor", "x": 2.0, "y": 0.25})).await;

    // then (期待する結果): 次に届くのは正しい移動のカーソル一覧だけ
    let cursors = recv_json(&mut a).await;
    assert_eq!(cursors["type"], "cursors");
    assert_eq!(cursors["cursors"][0]["id"], welcome["id"]);
    assert_eq!(cursors["cursors"][0]["x"], 1.0);
    assert_eq!(cursors["cursors"][0]["y"], 0.25);

    // when (操作):
    send_json(
        &mut a,
        json!({"type": "fragment", "content": "  still here  ", "x": 0.5, "y": 0.5}),
    )
    .await;

    // then (期待する結果):
    let fragment = recv_json(&mut a).await;
    assert_eq!(fragment["type"], "fragment");
    assert_eq!(fragment["fragment"]["content"], "still here");
    assert_eq!(fragment["fragment"]["authorId"], welcome["id"]);
    assert_eq!(fragment["fragment"]["hue"], welcome["hue"]);

    server.stop().await;
}

#[tokio::test]
async fn test_resonance_voice_moves_and_sounds_over_a_socket() {
    // テスト項目: resonance で中央から始まり、不正なフレームは無視され、移動と発音が全員に届く
    // given (前提条件):
    let server = TestServer::start("resonance").await;
    let mut a = server.connect("/resonance-ws").await;
    let welcome = recv_json(&mut a).await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["position"], json!({"x": 0.5, "y": 0.5}));
    assert_eq!(recv_json(&mut a).await["count"], 1);
    let mut b = server.connect("/resonance-ws").await;
    recv_of_type(&mut b, "welcome").await;
    assert_eq!(recv_json(&mut a).await["count"], 2);
    assert_eq!(recv_json(&mut b).await["count"], 2);

    // when (操作):
    send_json(&mut a, json!({"type": "sing"})).await;
    send_json(&mut a, json!({"type": "move", "x": -1.0, "y": 0.75})).await;

    // then (期待する結果): 不正なフレームへの応答はなく、移動だけが届く
    let moved = recv_json(&mut b).await;
    assert_eq!(moved["type"], "positions");
    let voice = moved["positions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["id"] == welcome["id"])
        .unwrap()
        .clone();
    assert_eq!(voice["x"], 0.0);
    assert_eq!(voice["y"], 0.75);
    assert_eq!(voice["active"], false);

    // when (操作):
    send_json(&mut a, json!({"type": "start"})).await;

    // then (期待する結果):
    let started = recv_json(&mut b).await;
    let voice = started["positions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["id"] == welcome["id"])
        .unwrap()
        .clone();
    assert_eq!(voice["active"], true);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_the_socket_open() {
    // テスト項目: edge に不正なフレームを送っても応答はなく、接続は使い続けられる
    // given (前提条件):
    let server = TestServer::start("edge-malformed").await;
    let mut a = server.connect("/edge-ws").await;
    assert_eq!(recv_json(&mut a).await["type"], "strokes");
    assert!(recv_json(&mut a).await["hue"].is_number());
    assert_eq!(recv_json(&mut a).await, json!({"type": "presence", "count": 1}));

    // when (操作):
    a.send(Message::Text("{\"type\":\"stroke\"".into()))
        .await
        .unwrap();
    send_json(&mut a, json!({"type": "stroke", "points": "none"})).await;
    send_json(&mut a, json!({"type": "stroke", "points": [{"x": 0.5, "y": 0.5}]})).await;

    // then (期待する結果):
    let stroke = recv_json(&mut a).await;
    assert_eq!(stroke["type"], "stroke");
    assert_eq!(stroke["stroke"]["points"], json!([{"x": 0.5, "y": 0.5}]));

    server.stop().await;
}

#[tokio::test]
async fn test_threshold_conversation() {
    // テスト項目: threshold で履歴・到着・人数が届き、発言が名前付きで全員に届く
    // given (前提条件):
    let server = TestServer::start("threshold").await;
    let mut a = server.connect("/threshold-ws").await;
    assert_eq!(recv_json(&mut a).await["type"], "history");
    assert_eq!(recv_json(&mut a).await["type"], "arrival");
    assert_eq!(
        recv_json(&mut a).await["content"],
        "You are alone at the threshold"
    );

    // when (操作):
    send_json(&mut a, json!({"type": "name", "name": "wren"})).await;
    send_json(&mut a, json!({"type": "message", "content": "is anyone here?"})).await;

    // then (期待する結果):
    let message = recv_of_type(&mut a, "message").await;
    assert_eq!(message["from"], "wren");
    assert_eq!(message["content"], "is anyone here?");

    let mut b = server.connect("/threshold-ws").await;
    let history = recv_json(&mut b).await;
    assert_eq!(history["messages"][0]["content"], "is anyone here?");

    server.stop().await;
}

#[tokio::test]
async fn test_federation_watcher_receives_snapshot() {
    // テスト項目: federation-watcher サブプロトコルで接続するとスナップショットが届く
    // given (前提条件):
    let server = TestServer::start("watched").await;
    let mut request = server.ws_url("/federation").into_client_request().unwrap();
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static("federation-watcher"),
    );

    // when (操作):
    let (mut watcher, response) = connect_async(request).await.unwrap();

    // then (期待する結果):
    assert_eq!(
        response.headers().get("sec-websocket-protocol").unwrap(),
        "federation-watcher"
    );
    let snapshot = recv_json(&mut watcher).await;
    assert_eq!(snapshot["instance"]["name"], "watched");
    assert_eq!(snapshot["constellation"]["connectedPeers"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_two_instances_form_a_constellation() {
    // テスト項目: 2 つのインスタンスが接続し、互いの presence が集計に反映される
    // given (前提条件):
    let p = TestServer::start("garden-p").await;
    let q = TestServer::start("garden-q").await;

    // when (操作):
    q.state
        .federation
        .connect_to_peer(&p.http_url("/"))
        .await
        .unwrap();

    // then (期待する結果):
    let on_p = p
        .wait_for_json("/api/federation", |s| {
            s["constellation"]["connectedPeers"] == 1 && s["peers"][0]["name"] == "garden-q"
        })
        .await;
    assert_eq!(on_p["peers"][0]["status"], "connected");
    let on_q = q
        .wait_for_json("/api/federation", |s| {
            s["peers"][0]["name"] == "garden-p" && s["peers"][0]["status"] == "connected"
        })
        .await;
    assert_eq!(on_q["peers"][0]["id"], p.state.federation.instance().id.as_str());

    // when (操作):
    let _visitor = p.connect("/presence?space=garden").await;

    // then (期待する結果):
    let on_q = q
        .wait_for_json("/api/federation", |s| {
            s["constellation"]["totalBeings"] == 1
        })
        .await;
    assert_eq!(on_q["peers"][0]["presence"]["garden"], 1);
    assert_eq!(on_q["localPresence"]["total"], 0);

    p.stop().await;
    q.stop().await;
}
