use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use drawboard::config::BoardConfig;
use drawboard::engine::Board;
use drawboard::engine::source::{ActorSource, RemoteSource};
use drawboard::engine::stepper::StepperState;
use drawboard::remote::ApiClient;
use drawboard::renderer::TermCanvas;
use drawboard::server::{self, SharedStore};
use tokio::net::TcpListener;

/// Run the service on an ephemeral port in a background runtime.
fn spawn_server() -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            server::serve(listener, SharedStore::default()).await.unwrap();
        });
    });
    let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    format!("http://{addr}")
}

#[test]
fn roster_starts_empty_and_keeps_creation_order() {
    let client = ApiClient::new(&spawn_server()).unwrap();
    assert!(client.artists().unwrap().is_empty());

    let ann = client.create_artist("Ann").unwrap();
    let bo = client.create_artist("Bo").unwrap();
    assert_eq!(ann.id, "artist1");
    assert_eq!(bo.id, "artist2");

    let names: Vec<String> = client.artists().unwrap().into_iter().map(|a| a.name).collect();
    assert_eq!(names, ["Ann", "Bo"]);
}

#[test]
fn moves_are_delivered_once() {
    let client = ApiClient::new(&spawn_server()).unwrap();
    let artist = client.create_artist("Ann").unwrap();
    client.add_move(&artist.id, "forward 3").unwrap();

    let moves = client.drain_moves(&artist.id).unwrap();
    let descriptions: Vec<&str> = moves.iter().map(|m| m.description.as_str()).collect();
    assert_eq!(descriptions, ["say Ann", "forward 3"]);

    assert!(client.drain_moves(&artist.id).unwrap().is_empty());

}

#[test]
fn hung_server_times_out_quickly() {
    // Accepts connections but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let config = BoardConfig::default();
    let client = ApiClient::with_timeout(&base, config.request_timeout()).unwrap();

    let started = Instant::now();
    assert!(client.artists().is_err());
    assert!(client.drain_moves("artist1").is_err());
    assert!(started.elapsed() < Duration::from_secs(2));

    let mut source = ActorSource::Remote(RemoteSource::new(client));
    assert!(source.poll().is_empty());
    drop(listener);
}

#[test]
fn unknown_artist_and_bad_json_are_rejected() {
    let base = spawn_server();
    let client = ApiClient::new(&base).unwrap();
    assert!(client.add_move("artist42", "left").is_err());

    let http = reqwest::blocking::Client::new();
    let resp = http
        .post(format!("{base}/api/artists/artist42/moves"))
        .body(r#"{"Description":"left"}"#)
        .send()
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let resp = http
        .post(format!("{base}/api/artists"))
        .body("not json")
        .send()
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[test]
fn remote_actor_waits_and_resumes_on_new_moves() {
    let client = ApiClient::new(&spawn_server()).unwrap();
    let artist = client.create_artist("Ann").unwrap();
    client.add_move(&artist.id, "color red").unwrap();
    client.add_move(&artist.id, "forward 2").unwrap();
    client.add_move(&artist.id, "not a move").unwrap();

    let mut source = ActorSource::Remote(RemoteSource::new(client.clone()));
    let mut board = Board::new(BoardConfig::default());
    let mut canvas = TermCanvas::new(0, 0);
    board.resize(310.0, 310.0, &mut canvas);
    assert_eq!(board.step_size(), 10.0);

    assert_eq!(board.connect(source.poll(), Duration::ZERO, &mut canvas), 1);
    // Polling again finds the same artist and adds nothing.
    assert_eq!(board.connect(source.poll(), Duration::ZERO, &mut canvas), 0);

    for ms in (0..=4000).step_by(50) {
        board.advance(Duration::from_millis(ms), &mut canvas);
    }

    let record = board.actor(&artist.id).unwrap();
    assert!(!record.is_finished());
    assert_eq!(record.stepper.state(), StepperState::Waiting);
    assert_eq!(record.stepper.style().color.as_deref(), Some("red"));
    let pose = record.stepper.pose();
    assert!(pose.x.abs() < 1e-6);
    assert!((pose.y + 20.0).abs() < 1e-6);

    assert!(client.drain_moves(&artist.id).unwrap().is_empty());

    // A move posted while the actor waits is picked up on a later poll.
    client.add_move(&artist.id, "right").unwrap();
    let mut turned = false;
    for ms in (4050..=7000).step_by(50) {
        board.advance(Duration::from_millis(ms), &mut canvas);
        let state = board.actor(&artist.id).unwrap().stepper.state();
        turned |= state == StepperState::Stepping;
    }
    assert!(turned);

    let record = board.actor(&artist.id).unwrap();
    assert_eq!(record.stepper.state(), StepperState::Waiting);
    assert!((record.stepper.pose().angle - 90.0).abs() < 1e-6);
    assert!((record.stepper.pose().y + 20.0).abs() < 1e-6);
}
