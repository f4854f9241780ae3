use vigil_core::ActionKind;
use vigil_kernel::adapters::{BackendCommand, TemplateBackend, PRIMARY_KEY};
use vigil_kernel::commands::run_line;
use vigil_kernel::config::EngineConfig;
use vigil_kernel::goals::Objective;
use vigil_kernel::kernel::FixedWallClock;
use vigil_kernel::{BackendRouter, ChatService, Engine};

fn service() -> ChatService {
    let config = EngineConfig::seeded(42);
    let router = BackendRouter::new(&config.backend)
        .with_backend(PRIMARY_KEY, TemplateBackend::new(PRIMARY_KEY));
    let engine = Engine::new(config).with_wall_clock(FixedWallClock(14));
    ChatService::new(engine, router)
}

#[tokio::test]
async fn messages_tick_once_before_replying() {
    let mut chat = service();
    let reply = chat.handle_message("hello there", None).await.unwrap();
    assert_eq!(chat.engine().tick(), 1);
    assert_eq!(reply.tick_log.len(), 1);
    assert_eq!(reply.state.tick, 1);
    assert_eq!(reply.mode, "realtime");
    assert_eq!(reply.commands, vec![BackendCommand::Propose]);
    assert_eq!(reply.meta.unwrap().model, PRIMARY_KEY);
    assert_eq!(chat.history().len(), 1);
}

#[tokio::test]
async fn slash_commands_do_not_tick() {
    let mut chat = service();
    let reply = chat.handle_message("/state", None).await.unwrap();
    assert_eq!(reply.mode, "slash");
    assert!(reply.meta.is_none());
    assert!(reply.reply.starts_with("tick 0"));
    assert_eq!(chat.engine().tick(), 0);

    let reply = chat.handle_message("/jump", None).await.unwrap();
    assert_eq!(reply.reply, "Command not recognized.");
}

#[tokio::test]
async fn backend_commands_are_applied() {
    let mut chat = service();

    chat.handle_message("set an intention please", None).await.unwrap();
    let intention = chat.engine().intention().unwrap();
    assert_eq!(intention.objective, Objective::Stabilize);

    chat.handle_message("pause for now", None).await.unwrap();
    assert!(chat.engine().is_paused());

    let tick = chat.engine().tick();
    let reply = chat.handle_message("resume", None).await.unwrap();
    assert!(reply.tick_log.iter().any(|l| l == "resumed"));
    assert_eq!(chat.engine().tick(), tick, "paused engine must not tick");
    assert!(!chat.engine().is_paused());
}

#[tokio::test]
async fn denied_inference_is_reported() {
    let mut config = EngineConfig::seeded(1);
    config.permissions.allow.retain(|c| c != "local_inference");
    let router = BackendRouter::new(&config.backend)
        .with_backend(PRIMARY_KEY, TemplateBackend::new(PRIMARY_KEY));
    let mut chat = ChatService::new(Engine::new(config), router);

    let reply = chat.handle_message("hi", None).await.unwrap();
    assert_eq!(reply.reply, "Not permitted: local_inference.");
    assert!(reply.meta.is_none());
    assert_eq!(chat.engine().permissions().denials().len(), 1);
}

#[test]
fn command_surface_round_trip() {
    let config = EngineConfig::seeded(5);
    let mut router = BackendRouter::new(&config.backend);
    let mut engine = Engine::new(config).with_wall_clock(FixedWallClock(9));

    let out = run_line("tick 3", &mut engine, &mut router).unwrap();
    assert_eq!(out.lines().count(), 3);
    assert_eq!(engine.tick(), 3);

    assert_eq!(run_line("PAUSE", &mut engine, &mut router).unwrap(), "Paused.");
    assert_eq!(
        run_line("tick", &mut engine, &mut router).unwrap(),
        "Paused; no tick."
    );
    run_line("resume", &mut engine, &mut router).unwrap();

    assert!(run_line("propose", &mut engine, &mut router)
        .unwrap()
        .starts_with("Proposal: "));
    assert_eq!(
        run_line("request network", &mut engine, &mut router).unwrap(),
        "Not permitted: network."
    );
    assert_eq!(
        run_line("suggest teleport", &mut engine, &mut router).unwrap(),
        "Unknown action: teleport"
    );
    assert_eq!(
        run_line("what now", &mut engine, &mut router).unwrap(),
        "Command not recognized."
    );
}

#[test]
fn backend_verbs_update_persisted_settings() {
    let config = EngineConfig::seeded(5);
    let mut router = BackendRouter::new(&config.backend);
    let mut engine = Engine::new(config);

    assert_eq!(
        run_line("backend force deep-local", &mut engine, &mut router).unwrap(),
        "Backend forced: deep-local."
    );
    assert_eq!(engine.router_settings().forced_model.as_deref(), Some("deep-local"));
    assert!(!engine.router_settings().auto_mode);

    assert_eq!(
        run_line("backend force cloud", &mut engine, &mut router).unwrap(),
        "Unknown backend key: cloud"
    );
    run_line("backend mode reflection", &mut engine, &mut router).unwrap();
    run_line("backend auto", &mut engine, &mut router).unwrap();
    assert!(engine.router_settings().auto_mode);
    assert_eq!(engine.router_settings().forced_model, None);
    assert!(run_line("backend status", &mut engine, &mut router)
        .unwrap()
        .contains("mode: reflection"));
}

#[test]
fn suggest_verb_respects_intention() {
    let config = EngineConfig::seeded(5);
    let mut router = BackendRouter::new(&config.backend);
    let mut engine = Engine::new(config);
    engine.set_intention(Objective::Recover);

    assert_eq!(
        run_line("suggest rest", &mut engine, &mut router).unwrap(),
        format!("Suggestion accepted: {}.", ActionKind::Rest)
    );
    assert!(run_line("suggest challenge", &mut engine, &mut router)
        .unwrap()
        .starts_with("Suggestion declined"));
}
