//! Device state-machine and cancellation tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use common::{free_port, sps_config, Sampler};
use mqpipe_core::Error;
use mqpipe_runtime::{register_default_drivers, Command, Device};

const TERMINATION_TIMEOUT: Duration = Duration::from_secs(20);

const TRAVERSALS: &[&[Command]] = &[
    &[
        Command::InitDevice,
        Command::Run,
        Command::Pause,
        Command::Stop,
        Command::End,
    ],
    &[Command::InitDevice, Command::Run, Command::Stop, Command::End],
    &[Command::InitDevice, Command::Run, Command::End],
    &[Command::InitDevice, Command::End],
    &[Command::End],
];

async fn sampler_device(transport: &str, cancel: &CancellationToken) -> (Device, u16) {
    register_default_drivers();
    let (port1, port2) = (free_port(), free_port());
    let mut cfg = sps_config(transport, port1, port2);
    cfg.id = "sampler1".to_owned();
    let device = Device::new(cancel, &cfg, Arc::new(Sampler::new(1024)), tokio::io::empty())
        .await
        .unwrap();
    (device, port1)
}

async fn run_traversal(transport: &str, cmds: &[Command]) {
    let cancel = CancellationToken::new();
    let (device, _) = sampler_device(transport, &cancel).await;
    let queue = device.commands();
    let handle = tokio::spawn(device.run());

    for &cmd in cmds {
        queue.push(cmd);
    }

    let cause = timeout(TERMINATION_TIMEOUT, handle)
        .await
        .unwrap_or_else(|_| panic!("device did not terminate for {cmds:?}"))
        .unwrap();
    assert!(cause.is_ok(), "unexpected cause for {cmds:?}: {cause:?}");
}

#[tokio::test]
async fn fsm_traversals_zeromq() {
    for cmds in TRAVERSALS {
        run_traversal("zeromq", cmds).await;
    }
}

#[tokio::test]
async fn fsm_traversals_nanomsg() {
    for cmds in TRAVERSALS {
        run_traversal("nanomsg", cmds).await;
    }
}

async fn run_traversal_from_input(transport: &str, input: &'static [u8]) {
    register_default_drivers();
    let (port1, port2) = (free_port(), free_port());
    let mut cfg = sps_config(transport, port1, port2);
    cfg.id = "sampler1".to_owned();

    let cancel = CancellationToken::new();
    let device = Device::new(&cancel, &cfg, Arc::new(Sampler::new(1024)), input)
        .await
        .unwrap();
    let handle = tokio::spawn(device.run());

    let cause = timeout(TERMINATION_TIMEOUT, handle)
        .await
        .unwrap_or_else(|_| panic!("device did not terminate for input {input:?}"))
        .unwrap();
    assert!(cause.is_ok(), "unexpected cause for {input:?}: {cause:?}");
}

#[tokio::test]
async fn fsm_traversals_from_input_zeromq() {
    for input in [
        b"i\nr\np\ns\nq\n".as_slice(),
        b"i\nr\ns\nq\n",
        b"i\nr\nq\n",
        b"i\nq\n",
        b"q\n",
    ] {
        run_traversal_from_input("zeromq", input).await;
    }
}

#[tokio::test]
async fn fsm_traversals_from_input_nanomsg() {
    for input in [b"i\nr\nq\n".as_slice(), b"q\n"] {
        run_traversal_from_input("nanomsg", input).await;
    }
}

#[tokio::test]
async fn cancellation_is_the_termination_cause() {
    let cancel = CancellationToken::new();
    let (device, port1) = sampler_device("zeromq", &cancel).await;
    let queue = device.commands();
    let handle = tokio::spawn(device.run());

    queue.push(Command::InitDevice);
    queue.push(Command::Run);
    tokio::time::sleep(Duration::from_millis(200)).await;

    cancel.cancel();
    let cause = timeout(TERMINATION_TIMEOUT, handle).await.unwrap().unwrap();
    assert!(
        matches!(cause, Err(Error::Cancelled)),
        "expected cancellation cause, got {cause:?}"
    );

    // The sampler's listener is gone: the port can be bound again.
    let mut rebound = false;
    for _ in 0..50 {
        if std::net::TcpListener::bind(("127.0.0.1", port1)).is_ok() {
            rebound = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(rebound, "socket was not closed before run returned");
}
