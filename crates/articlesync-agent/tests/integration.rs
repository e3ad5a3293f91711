use articlesync_agent::{
    session, ChannelTransport, Engine, Outbound, ReceiveOutcome, ReplicationManager,
    SessionConfig, SessionEvent, TickOutcome,
};
use articlesync_core::{DocId, EditAction, EditStamp, PendingPolicy};
use articlesync_proto::{ActionEnvelope, TopicScheme};
use rumqttc::{Event, EventLoop, Packet};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use uuid::Uuid;

async fn spawn_eventloop(mut eventloop: EventLoop) {
    loop {
        if eventloop.poll().await.is_err() {
            break;
        }
    }
}

fn peer(
    seed: &str,
    policy: PendingPolicy,
) -> (Engine<ChannelTransport>, mpsc::UnboundedReceiver<Outbound>) {
    let (transport, rx) = ChannelTransport::pair();
    let engine = Engine::new(DocId::new("article-1"), seed, Uuid::new_v4(), policy, transport);
    (engine, rx)
}

#[tokio::test]
async fn sequential_edits_converge() {
    let (mut alice, mut alice_out) = peer("hello world", PendingPolicy::Fold);
    let (mut bob, mut bob_out) = peer("hello world", PendingPolicy::Fold);

    alice.set_live_text("hello brave world");
    assert!(matches!(alice.tick().await.unwrap(), TickOutcome::Sent { .. }));
    let sent = alice_out.try_recv().unwrap();
    assert!(matches!(
        bob.remote_receive(&sent.payload).unwrap(),
        ReceiveOutcome::Merged(_)
    ));

    bob.set_live_text("hello brave new world");
    bob.tick().await.unwrap();
    let sent = bob_out.try_recv().unwrap();
    alice.remote_receive(&sent.payload).unwrap();

    alice.set_live_text("hello brave new world!");
    alice.tick().await.unwrap();
    let sent = alice_out.try_recv().unwrap();
    bob.remote_receive(&sent.payload).unwrap();

    assert_eq!(alice.state().live_text(), "hello brave new world!");
    assert_eq!(bob.state().live_text(), alice.state().live_text());
    assert!(!alice.state().is_dirty());
    assert!(!bob.state().is_dirty());
}

#[tokio::test]
async fn rebroadcast_delivers_edit_typed_during_merge() {
    let (mut alice, mut alice_out) = peer("abc", PendingPolicy::Rebroadcast);
    let (mut bob, mut bob_out) = peer("abc", PendingPolicy::Rebroadcast);

    alice.set_live_text("abcY");
    alice.tick().await.unwrap();

    // Bob types before Alice's action arrives.
    bob.set_live_text("abcZ");
    let sent = alice_out.try_recv().unwrap();
    bob.remote_receive(&sent.payload).unwrap();
    assert_eq!(bob.state().live_text(), "abcYZ");
    assert_eq!(bob.state().pending(), EditAction::insertion(4, "Z"));

    bob.tick().await.unwrap();
    let sent = bob_out.try_recv().unwrap();
    alice.remote_receive(&sent.payload).unwrap();

    assert_eq!(alice.state().live_text(), "abcYZ");
    assert_eq!(bob.state().live_text(), "abcYZ");
}

#[tokio::test]
async fn redelivered_action_is_applied_once() {
    let (mut alice, mut alice_out) = peer("text", PendingPolicy::Fold);
    let (mut bob, _bob_out) = peer("text", PendingPolicy::Fold);

    alice.set_live_text("text!");
    alice.tick().await.unwrap();
    let sent = alice_out.try_recv().unwrap();

    bob.remote_receive(&sent.payload).unwrap();
    bob.remote_receive(&sent.payload).unwrap();
    assert_eq!(bob.state().live_text(), "text!");

    // Own echo leaves the sender untouched.
    alice.remote_receive(&sent.payload).unwrap();
    assert_eq!(alice.state().live_text(), "text!");
}

#[tokio::test]
async fn sessions_relay_edits_between_peers() {
    let doc_id = DocId::new("article-1");
    let config = SessionConfig {
        tick_interval: Duration::from_millis(10),
        ..SessionConfig::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (alice_transport, mut alice_out) = ChannelTransport::pair();
    let (bob_transport, mut bob_out) = ChannelTransport::pair();
    let alice = session::spawn(
        doc_id.clone(),
        "draft".to_string(),
        alice_transport,
        config.clone(),
        shutdown_rx.clone(),
    );
    let bob = session::spawn(
        doc_id,
        "draft".to_string(),
        bob_transport,
        config,
        shutdown_rx,
    );

    let to_bob = bob.sender();
    let to_alice = alice.sender();
    let relay = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(out) = alice_out.recv() => {
                    let _ = to_bob.send(SessionEvent::Remote(out.payload)).await;
                }
                Some(out) = bob_out.recv() => {
                    let _ = to_alice.send(SessionEvent::Remote(out.payload)).await;
                }
                else => break,
            }
        }
    });

    assert!(alice.deliver(SessionEvent::LocalEdit("final draft".to_string())).await);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(bob.deliver(SessionEvent::LocalEdit("final draft v2".to_string())).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    shutdown_tx.send(true).unwrap();
    let alice_state = alice.join().await.unwrap();
    let bob_state = bob.join().await.unwrap();
    relay.abort();

    assert_eq!(alice_state.live_text(), "final draft v2");
    assert_eq!(bob_state.live_text(), "final draft v2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mqtt_action_roundtrip() {
    if std::env::var("ARTICLESYNC_INTEGRATION").is_err() {
        eprintln!("Skipping integration test; set ARTICLESYNC_INTEGRATION=1 to run");
        return;
    }

    let broker = std::env::var("ARTICLESYNC_MQTT_BROKER")
        .unwrap_or_else(|_| "tcp://localhost:1883".to_string());

    let scheme = TopicScheme::new("integration");
    let doc_id = DocId::new("integration-article");
    let (publisher, pub_eventloop) = ReplicationManager::new(
        &broker,
        &format!("pub-{}", Uuid::new_v4()),
        scheme.clone(),
    )
    .unwrap();
    tokio::spawn(spawn_eventloop(pub_eventloop));

    let (subscriber, mut sub_eventloop) = ReplicationManager::new(
        &broker,
        &format!("sub-{}", Uuid::new_v4()),
        scheme,
    )
    .unwrap();
    subscriber.subscribe(&doc_id).await.unwrap();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        loop {
            match sub_eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let _ = tx.send(publish.payload.to_vec());
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    let stamp = EditStamp {
        actor_id: Uuid::new_v4(),
        seq: 1,
    };
    let action = EditAction::insertion(0, "Breaking: ");
    let payload = ActionEnvelope::new(&doc_id, stamp, &action)
        .unwrap()
        .to_cbor()
        .unwrap();
    publisher.publish_action(&doc_id, payload).unwrap();

    let received = timeout(Duration::from_secs(5), rx)
        .await
        .expect("timeout waiting for MQTT message")
        .expect("subscriber dropped");

    let decoded = ActionEnvelope::from_cbor(&received).unwrap();
    assert_eq!(decoded.doc_id(), doc_id);
    assert_eq!(decoded.stamp().unwrap(), stamp);
    assert_eq!(decoded.action().unwrap(), action);
}
