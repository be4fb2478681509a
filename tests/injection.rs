use bindwire::prelude::*;
use std::sync::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

#[derive(Injectable)]
pub struct FixedClock {}

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }
}

struct NamedPlugin(&'static str);

impl Plugin for NamedPlugin {
    fn name(&self) -> &str {
        self.0
    }
}

pub struct AuditLog;

#[derive(Injectable)]
pub struct Greeter {
    clock: Arc<dyn Clock>,
    #[inject(id = "formal")]
    salutation: Arc<String>,
    plugins: Vec<Arc<dyn Plugin>>,
    audit: Option<Arc<AuditLog>>,
    #[inject(skip)]
    greeted: Mutex<u32>,
}

impl Greeter {
    fn greet(&self, name: &str) -> String {
        *self.greeted.lock().unwrap() += 1;
        format!("{} {} at {}", self.salutation, name, self.clock.now())
    }
}

fn greeter_builder() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.implement::<FixedClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
    builder.implement::<NamedPlugin, dyn Plugin, _>(|p| p as Arc<dyn Plugin>);
    builder
        .bind::<dyn Clock>()
        .to::<FixedClock>()
        .from_new()
        .as_singleton();
    builder
        .bind::<String>()
        .with_id("formal")
        .from_instance(Arc::new("Good evening,".to_string()));
    for name in ["spell-check", "emoji"] {
        builder
            .bind::<dyn Plugin>()
            .to::<NamedPlugin>()
            .from_instance(Arc::new(NamedPlugin(name)));
    }
    builder
}

#[test]
fn test_derive_injects_every_field_kind() {
    init_tracing();
    let mut builder = greeter_builder();
    builder.bind::<Greeter>().from_new().as_singleton();
    let container = builder.build().unwrap();

    let greeter = container.resolve::<Greeter>().unwrap();
    assert_eq!(greeter.greet("Ada"), "Good evening, Ada at 1700000000");
    assert_eq!(*greeter.greeted.lock().unwrap(), 1);
    assert!(greeter.audit.is_none());

    let plugins: Vec<&str> = greeter.plugins.iter().map(|p| p.name()).collect();
    assert_eq!(plugins, vec!["spell-check", "emoji"]);
}

#[test]
fn test_optional_field_is_filled_when_bound() {
    let mut builder = greeter_builder();
    builder.register(AuditLog);
    let container = builder.build().unwrap();

    let greeter = container.instantiate::<Greeter>().unwrap();
    assert!(greeter.audit.is_some());
}

#[test]
fn test_missing_required_field_names_the_contract() {
    let mut builder = ContainerBuilder::new();
    builder.bind::<Greeter>().from_new();
    let container = builder.build().unwrap();

    let err = container.resolve::<Greeter>().err().unwrap();
    assert!(err.is_missing_binding());
    assert!(err.to_string().contains("Clock"));
}

#[derive(Injectable)]
pub struct Engine {
    wheels: Arc<Wheels>,
}

#[derive(Injectable)]
pub struct Wheels {
    engine: Arc<Engine>,
}

#[test]
fn test_constructor_cycle_reports_chain() {
    init_tracing();
    let mut builder = ContainerBuilder::new();
    builder.bind::<Engine>().from_new().as_singleton();
    builder.bind::<Wheels>().from_new().as_singleton();
    let container = builder.build().unwrap();

    match container.resolve::<Engine>().err().unwrap() {
        BindwireError::CyclicDependency { chain } => {
            assert_eq!(chain.len(), 3);
            assert!(chain[0].contains("Engine"));
            assert!(chain[1].contains("Wheels"));
            assert!(chain[2].contains("Engine"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[derive(Injectable)]
pub struct Player {
    inventory: Arc<Inventory>,
}

#[derive(Injectable)]
pub struct Inventory {
    owner: Lazy<Player>,
}

#[test]
fn test_lazy_field_breaks_cycle() {
    let mut builder = ContainerBuilder::new();
    builder.bind::<Player>().from_new().as_singleton();
    builder.bind::<Inventory>().from_new().as_singleton();
    let container = builder.build().unwrap();

    let player = container.resolve::<Player>().unwrap();
    assert!(!player.inventory.owner.is_resolved());

    let owner = player.inventory.owner.get().unwrap();
    assert!(Arc::ptr_eq(&owner, &player));
    let _ = player.inventory.owner.get().unwrap();
    assert!(player.inventory.owner.is_resolved());
}

#[test]
fn test_binding_argument_satisfies_field() {
    let mut builder = greeter_builder();
    builder
        .bind::<Greeter>()
        .from_new()
        .with_argument(Arc::new("Hi".to_string()));
    let container = builder.build().unwrap();

    // The named "formal" binding still wins because the field asks for an id.
    let greeter = container.resolve::<Greeter>().unwrap();
    assert!(greeter.greet("Grace").starts_with("Good evening,"));
}

#[derive(Injectable)]
pub struct Banner {
    text: Arc<String>,
}

#[test]
fn test_binding_argument_fills_unnamed_field() {
    let mut builder = ContainerBuilder::new();
    builder
        .bind::<Banner>()
        .from_new()
        .with_argument(Arc::new("welcome".to_string()));
    let container = builder.build().unwrap();

    assert_eq!(*container.resolve::<Banner>().unwrap().text, "welcome");
}

struct ClockModule;

impl Module for ClockModule {
    fn install(&self, builder: &mut ContainerBuilder) -> Result<()> {
        builder.implement::<FixedClock, dyn Clock, _>(|c| c as Arc<dyn Clock>);
        builder
            .bind::<dyn Clock>()
            .to::<FixedClock>()
            .from_new()
            .as_singleton();
        Ok(())
    }
}

#[test]
fn test_child_container_falls_back_to_parent() {
    let mut builder = ContainerBuilder::new();
    builder.install(&ClockModule).unwrap();
    builder
        .bind::<String>()
        .from_instance(Arc::new("parent".to_string()));
    let parent = builder.build().unwrap();

    let mut child = parent.child();
    child
        .bind::<String>()
        .from_instance(Arc::new("child".to_string()));
    let child = child.build().unwrap();

    assert_eq!(*child.resolve::<String>().unwrap(), "child");
    assert!(Arc::ptr_eq(
        &child.resolve::<dyn Clock>().unwrap(),
        &parent.resolve::<dyn Clock>().unwrap()
    ));

    let all: Vec<String> = child
        .resolve_all::<String>()
        .unwrap()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(all, vec!["child", "parent"]);
}

#[test]
fn test_dispose_hooks_run_in_reverse_creation_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut builder = ContainerBuilder::new();
    for (id, text) in [("first", "a"), ("second", "b")] {
        let log = Arc::clone(&log);
        builder
            .bind::<String>()
            .with_id(id)
            .from_method(move |_| Ok(Arc::new(text.to_string())))
            .as_singleton()
            .non_lazy()
            .on_dispose(move |s: &String| log.lock().unwrap().push(s.clone()));
    }
    let container = builder.build().unwrap();

    container.dispose();
    container.dispose();
    drop(container);
    assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
}
