//! End-to-end flows against a scripted iRODS agent on the loopback interface.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use irods_client::{
    Account, ClientError, PipelineConfiguration, Session, SslNegotiationPolicy,
};
use irods_protocol::challenge::compute_challenge_response;
use irods_protocol::message::{CS_NEG_USE_TCP_RESULT, OPTION_REQUEST_NEGOTIATION};
use irods_protocol::{api, Decoder, Encoder, ErrorKind, MessageType, Tag};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const COOKIE: i32 = 400;
const BOOT_TIME: i64 = 1_700_000_000;

#[derive(Clone, Default)]
struct Script {
    password: String,
    offer_negotiation: bool,
    reconnect_port: u16,
}

/// What the agent saw on all of its connections.
#[derive(Default)]
struct AgentLog {
    messages: Mutex<Vec<String>>,
    accepted: AtomicUsize,
}

impl AgentLog {
    fn count(&self, entry: &str) -> usize {
        self.messages.lock().iter().filter(|m| *m == entry).count()
    }
}

/// How a served connection ended.
#[derive(Debug, PartialEq)]
enum Ending {
    Disconnect,
    Eof,
}

struct Agent {
    port: u16,
    log: Arc<AgentLog>,
    endings: mpsc::UnboundedReceiver<Ending>,
}

async fn spawn_agent(script: Script) -> Agent {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    spawn_agent_on(listener, script)
}

fn spawn_agent_on(listener: TcpListener, script: Script) -> Agent {
    let port = listener.local_addr().unwrap().port();
    let log = Arc::new(AgentLog::default());
    let (tx, endings) = mpsc::unbounded_channel();
    let script = Arc::new(script);

    let accept_log = log.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            accept_log.accepted.fetch_add(1, Ordering::SeqCst);
            let script = script.clone();
            let log = accept_log.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let ending = serve(socket, &script, &log).await;
                let _ = tx.send(ending);
            });
        }
    });

    Agent {
        port,
        log,
        endings,
    }
}

fn version_reply(script: &Script) -> Tag {
    Tag::new("Version_PI")
        .value_child("status", 0)
        .value_child("relVersion", "rods4.2.8")
        .value_child("apiVersion", "d")
        .value_child("reconnPort", script.reconnect_port)
        .value_child(
            "reconnAddr",
            if script.reconnect_port > 0 { "127.0.0.1" } else { "" },
        )
        .value_child("cookie", COOKIE)
}

fn server_info() -> Tag {
    Tag::new("MiscSvrInfo_PI")
        .value_child("serverType", 1)
        .value_child("serverBootTime", BOOT_TIME)
        .value_child("relVersion", "rods4.2.8")
        .value_child("apiVersion", "d")
        .value_child("rodsZone", "tempZone")
}

async fn serve(mut socket: TcpStream, script: &Script, log: &AgentLog) -> Ending {
    let mut decoder = Decoder::new();
    let mut buf = vec![0u8; 8192];
    let challenge = STANDARD.encode([7u8; 64]);

    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return Ending::Eof,
            Ok(n) => n,
        };
        decoder.extend(&buf[..n]);

        while let Some(envelope) = decoder.decode_envelope().unwrap() {
            let header = &envelope.header;
            log.messages
                .lock()
                .push(format!("{}:{}", header.msg_type.as_str(), header.int_info));

            let reply = match &header.msg_type {
                MessageType::Connect => {
                    let pack = envelope.body_tag(true).unwrap().unwrap();
                    let wants_negotiation =
                        pack.child_str("option").unwrap() == OPTION_REQUEST_NEGOTIATION;
                    if script.offer_negotiation && wants_negotiation {
                        let offer = Tag::new("CS_NEG_PI")
                            .value_child("status", 1)
                            .value_child("result", "CS_NEG_DONT_CARE");
                        Encoder::encode(MessageType::NegotiationRequest, Some(&offer), &[], &[], 0)
                    } else {
                        Encoder::encode(MessageType::Version, Some(&version_reply(script)), &[], &[], 0)
                    }
                }
                MessageType::NegotiationRequest => {
                    let answer = envelope.body_tag(true).unwrap().unwrap();
                    assert_eq!(answer.child_str("result").unwrap(), CS_NEG_USE_TCP_RESULT);
                    Encoder::encode(MessageType::Version, Some(&version_reply(script)), &[], &[], 0)
                }
                MessageType::ApiRequest => match header.int_info {
                    api::AUTH_REQUEST_AN => {
                        let out = Tag::new("authRequestOut_PI").value_child("challenge", &challenge);
                        Encoder::encode_reply(Some(&out), 0)
                    }
                    api::AUTH_RESPONSE_AN => {
                        let response = envelope.body_tag(true).unwrap().unwrap();
                        let expected =
                            compute_challenge_response(&challenge, &script.password).unwrap();
                        assert_eq!(response.child_str("username").unwrap(), "rods#tempZone");
                        if response.child_str("response").unwrap() == expected {
                            Encoder::encode_reply(None, 0)
                        } else {
                            Encoder::encode_error_reply(-826_000, "CAT_INVALID_AUTHENTICATION")
                        }
                    }
                    api::GET_MISC_SVR_INFO_AN => Encoder::encode_reply(Some(&server_info()), 0),
                    _ => Encoder::encode_error_reply(-816_000, "unexpected api"),
                },
                MessageType::Reconnect => {
                    let message = envelope.body_tag(true).unwrap().unwrap();
                    assert_eq!(message.child_int("cookie").unwrap(), COOKIE);
                    let reply = Tag::new("ReconnMsg_PI")
                        .value_child("status", 0)
                        .value_child("cookie", COOKIE)
                        .value_child("procState", 0)
                        .value_child("flag", 0);
                    Encoder::encode(MessageType::Reconnect, Some(&reply), &[], &[], 0)
                }
                MessageType::Disconnect => return Ending::Disconnect,
                other => panic!("agent received unexpected {:?}", other),
            };

            if socket.write_all(&reply).await.is_err() {
                return Ending::Eof;
            }
        }
    }
}

fn account(port: u16, password: &str) -> Account {
    Account::new("127.0.0.1", port, "rods", password, "tempZone")
}

fn script(password: &str) -> Script {
    Script {
        password: password.to_string(),
        ..Script::default()
    }
}

#[tokio::test]
async fn test_standard_login_and_server_info() {
    let mut agent = spawn_agent(script("rods")).await;
    let session = Session::new(PipelineConfiguration::default());

    let protocol = tokio_test::assert_ok!(
        session.current_connection(&account(agent.port, "rods")).await
    );

    let startup = protocol.startup_response().unwrap();
    assert_eq!(startup.release_version, "rods4.2.8");
    assert!(startup.is_eirods());
    let auth = protocol.auth_response().unwrap();
    assert_eq!(auth.authenticated_account.user, "rods");

    let props = protocol.server_properties().unwrap();
    assert!(props.icat_enabled);
    assert_eq!(props.zone, "tempZone");
    assert_eq!(props.boot_time.unwrap().timestamp(), BOOT_TIME);
    assert!(session
        .discovered_properties()
        .server_properties("127.0.0.1", "tempZone")
        .is_some());

    assert_eq!(agent.log.count("RODS_CONNECT:0"), 1);
    assert_eq!(agent.log.count("RODS_API_REQ:703"), 1);
    assert_eq!(agent.log.count("RODS_API_REQ:704"), 1);
    assert_eq!(agent.log.count("RODS_API_REQ:700"), 1);

    tokio_test::assert_ok!(session.close_session().await);
    assert_eq!(agent.endings.recv().await, Some(Ending::Disconnect));
    assert_eq!(session.cached_count(), 0);
}

#[tokio::test]
async fn test_session_reuses_protocol_until_forced_return() {
    let mut agent = spawn_agent(script("rods")).await;
    let session = Session::new(PipelineConfiguration::default());
    let account = account(agent.port, "rods");

    let first = session.current_connection(&account).await.unwrap();
    let again = session.current_connection(&account).await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(agent.log.accepted.load(Ordering::SeqCst), 1);

    session.return_with_force(first.clone()).await;
    assert_eq!(agent.endings.recv().await, Some(Ending::Eof));
    assert_eq!(session.cached_count(), 0);
    assert!(!first.is_connected().await);

    let fresh = session.current_connection(&account).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(agent.log.accepted.load(Ordering::SeqCst), 2);
    // Second login reuses the discovered server properties.
    assert_eq!(agent.log.count("RODS_API_REQ:700"), 1);
    assert!(fresh.server_properties().is_some());

    session.close_session().await.unwrap();
}

#[tokio::test]
async fn test_wrong_password_closes_connection() {
    let mut agent = spawn_agent(script("rods")).await;
    let session = Session::new(PipelineConfiguration::default());

    let err = session
        .current_connection(&account(agent.port, "not-the-password"))
        .await
        .unwrap_err();
    match &err {
        ClientError::Server { kind, code, .. } => {
            assert_eq!(*kind, ErrorKind::Authentication);
            assert_eq!(*code, -826_000);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.code(), Some(-826_000));

    assert_eq!(agent.endings.recv().await, Some(Ending::Eof));
    assert_eq!(agent.log.count("RODS_DISCONNECT:0"), 0);
    assert_eq!(session.cached_count(), 0);
}

#[tokio::test]
async fn test_negotiation_falls_back_to_tcp() {
    let agent = spawn_agent(Script {
        offer_negotiation: true,
        ..script("rods")
    })
    .await;
    let config = PipelineConfiguration::default()
        .with_negotiation_policy(SslNegotiationPolicy::Refuse);
    let session = Session::new(config);

    let protocol = session
        .current_connection(&account(agent.port, "rods"))
        .await
        .unwrap();
    assert!(!protocol.is_tls().await);
    assert_eq!(agent.log.count("RODS_CS_NEG_T:0"), 1);
    assert_eq!(agent.log.count("RODS_API_REQ:704"), 1);

    session.close_session().await.unwrap();
}

#[tokio::test]
async fn test_negotiation_requiring_ssl_is_unsupported() {
    let agent = spawn_agent(Script {
        offer_negotiation: true,
        ..script("rods")
    })
    .await;
    let config = PipelineConfiguration::default()
        .with_negotiation_policy(SslNegotiationPolicy::Require);
    let session = Session::new(config);

    let result = session.current_connection(&account(agent.port, "rods")).await;
    assert!(matches!(result, Err(ClientError::Unsupported(_))));
    assert_eq!(agent.log.count("RODS_API_REQ:703"), 0);
}

#[tokio::test]
async fn test_reconnect_never_splits_an_exchange() {
    let reconnect_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let reconnect_port = reconnect_listener.local_addr().unwrap().port();
    let standby = spawn_agent_on(reconnect_listener, script("rods"));
    let agent = spawn_agent(Script {
        reconnect_port,
        ..script("rods")
    })
    .await;

    let config = PipelineConfiguration::default().with_reconnect(Duration::from_millis(30));
    let session = Session::new(config);
    let protocol = session
        .current_connection(&account(agent.port, "rods"))
        .await
        .unwrap();
    assert!(protocol.is_reconnecting());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let protocol = protocol.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    let props = protocol.probe_server_properties().await?;
                    assert_eq!(props.zone, "tempZone");
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                Ok::<_, ClientError>(())
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap().unwrap();
    }

    assert!(standby.log.accepted.load(Ordering::SeqCst) >= 1);
    assert!(standby.log.count("RODS_RECONNECT:0") >= 1);
    assert!(protocol.is_connected().await);

    session.close_session().await.unwrap();
    assert!(!protocol.is_reconnecting());
}
