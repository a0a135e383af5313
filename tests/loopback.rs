use std::sync::Arc;
use std::time::Duration;
use toneport::{LineCoding, ModemConfig, ModemError, Transport};

fn loopback_transport(baud: u32, coding: LineCoding) -> Transport {
    Transport::new(ModemConfig {
        baud,
        coding,
        amplitude: 0.2,
        loopback: true,
    })
    .unwrap()
}

async fn assert_roundtrip(baud: u32, coding: LineCoding, message: &[u8]) {
    let transport = loopback_transport(baud, coding);
    transport.connect().await.unwrap();

    transport.write(message).unwrap();
    let received = transport
        .read(message.len(), Some(Duration::from_secs(10)))
        .await
        .unwrap();
    transport.stop();

    assert_eq!(received, message);
}

#[tokio::test]
async fn roundtrip_300_baud_standard() {
    assert_roundtrip(300, LineCoding::Standard, b"derp").await;
}

#[tokio::test]
async fn roundtrip_1200_baud_standard() {
    assert_roundtrip(1200, LineCoding::Standard, b"\xffderp").await;
}

#[tokio::test]
async fn roundtrip_300_baud_nrzi() {
    assert_roundtrip(300, LineCoding::Nrzi, b"derp").await;
}

#[tokio::test]
async fn roundtrip_1200_baud_nrzi() {
    assert_roundtrip(1200, LineCoding::Nrzi, b"\xffderp").await;
}

#[tokio::test]
async fn concatenated_writes_arrive_in_order() {
    let transport = loopback_transport(1200, LineCoding::Standard);
    transport.connect().await.unwrap();

    transport.write(b"one").unwrap();
    transport.write(b"two").unwrap();
    let received = transport.read(6, Some(Duration::from_secs(10))).await.unwrap();
    transport.stop();

    assert_eq!(received, b"onetwo");
}

#[tokio::test]
async fn read_times_out_without_data() {
    let transport = loopback_transport(1200, LineCoding::Standard);
    transport.connect().await.unwrap();

    let start = std::time::Instant::now();
    let result = transport.read(1, Some(Duration::from_millis(200))).await;
    transport.stop();

    assert!(matches!(result, Err(ModemError::Timeout)));
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn receiving_latch_fires_during_transmission() {
    let transport = Arc::new(loopback_transport(300, LineCoding::Standard));
    transport.connect().await.unwrap();

    let watcher = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.receiving().wait_set().await })
    };

    transport.write(b"x").unwrap();
    tokio::time::timeout(Duration::from_secs(10), watcher)
        .await
        .expect("receiving latch never set")
        .unwrap();
    transport.read(1, Some(Duration::from_secs(10))).await.unwrap();
    transport.stop();
}
