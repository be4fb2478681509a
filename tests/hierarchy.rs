use bindwire::di::Instance;
use bindwire::prelude::*;
use std::collections::HashMap;

/// In-memory scene: node 1 is the root with children 2 and 3; node 4 is a
/// second, inactive root.
struct FakeScene {
    children: HashMap<NodeId, Vec<NodeId>>,
    parents: HashMap<NodeId, NodeId>,
    components: HashMap<NodeId, Vec<Instance>>,
    inactive: Vec<NodeId>,
}

impl FakeScene {
    fn new() -> Self {
        let mut scene = FakeScene {
            children: HashMap::new(),
            parents: HashMap::new(),
            components: HashMap::new(),
            inactive: vec![NodeId(4)],
        };
        scene.attach(NodeId(1), NodeId(2));
        scene.attach(NodeId(1), NodeId(3));
        scene
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.children.entry(parent).or_default().push(child);
        self.parents.insert(child, parent);
    }

    fn add<T: Send + Sync + 'static>(&mut self, node: NodeId, component: Arc<T>) {
        self.components
            .entry(node)
            .or_default()
            .push(Instance::new(component));
    }

    fn on(&self, node: NodeId) -> Vec<Component> {
        self.components
            .get(&node)
            .into_iter()
            .flatten()
            .map(|instance| Component {
                node,
                instance: instance.clone(),
            })
            .collect()
    }
}

impl HierarchyQuery for FakeScene {
    fn components_in_children(&self, node: NodeId, include_inactive: bool) -> Vec<Component> {
        if !include_inactive && self.inactive.contains(&node) {
            return Vec::new();
        }
        let mut found = self.on(node);
        for child in self.children.get(&node).into_iter().flatten() {
            found.extend(self.components_in_children(*child, include_inactive));
        }
        found
    }

    fn components_in_parent(&self, node: NodeId) -> Vec<Component> {
        let mut found = self.on(node);
        let mut current = self.parents.get(&node);
        while let Some(parent) = current {
            found.extend(self.on(*parent));
            current = self.parents.get(parent);
        }
        found
    }

    fn components(&self, node: NodeId) -> Vec<Component> {
        self.on(node)
    }

    fn root_objects(&self) -> Vec<NodeId> {
        vec![NodeId(1), NodeId(4)]
    }
}

#[derive(Debug)]
struct Health(u32);

fn scene() -> (FakeScene, Arc<Health>) {
    let mut scene = FakeScene::new();
    let root_health = Arc::new(Health(100));
    scene.add(NodeId(1), Arc::clone(&root_health));
    scene.add(NodeId(2), Arc::new(Health(20)));
    scene.add(NodeId(3), Arc::new(Health(30)));
    scene.add(NodeId(3), Arc::new("not health"));
    scene.add(NodeId(4), Arc::new(Health(40)));
    (scene, root_health)
}

fn builder_with_scene(scene: FakeScene) -> ContainerBuilder {
    let mut builder = ContainerBuilder::new();
    builder.implement::<FakeScene, dyn HierarchyQuery, _>(|s| s as Arc<dyn HierarchyQuery>);
    builder.register_component::<Health>();
    builder
        .bind::<dyn HierarchyQuery>()
        .to::<FakeScene>()
        .from_instance(Arc::new(scene));
    builder
}

fn values(container: &Container, node: NodeId) -> Vec<u32> {
    container
        .request::<Health>()
        .node(node)
        .all()
        .unwrap()
        .map(|h| h.0)
        .collect()
}

#[test]
fn test_children_lookup_collects_descendants() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder
        .bind::<Health>()
        .from_component_in_children(LookupOptions::new());
    let container = builder.build().unwrap();

    assert_eq!(values(&container, NodeId(1)), vec![100, 20, 30]);
    assert_eq!(values(&container, NodeId(3)), vec![30]);
}

#[test]
fn test_children_lookup_skips_requester() {
    let (scene, root_health) = scene();
    let mut builder = builder_with_scene(scene);
    builder
        .bind::<Health>()
        .from_component_in_children(LookupOptions::new().predicate(|h: &Health| h.0 > 25));
    let container = builder.build().unwrap();

    let found: Vec<u32> = container
        .request::<Health>()
        .node(NodeId(1))
        .requester(Instance::new(root_health))
        .all()
        .unwrap()
        .map(|h| h.0)
        .collect();
    assert_eq!(found, vec![30]);
}

#[test]
fn test_parents_lookup_can_exclude_own_node() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder
        .bind::<Health>()
        .with_id("all")
        .from_component_in_parents(false);
    builder
        .bind::<Health>()
        .with_id("ancestors")
        .from_component_in_parents(true);
    let container = builder.build().unwrap();

    let lookup = |id: &'static str| -> Vec<u32> {
        container
            .request::<Health>()
            .id(id)
            .node(NodeId(2))
            .all()
            .unwrap()
            .map(|h| h.0)
            .collect()
    };
    assert_eq!(lookup("all"), vec![20, 100]);
    assert_eq!(lookup("ancestors"), vec![100]);
}

#[test]
fn test_whole_hierarchy_respects_inactive_flag() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder
        .bind::<Health>()
        .with_id("active")
        .from_component_in_hierarchy(LookupOptions::new());
    builder
        .bind::<Health>()
        .with_id("everything")
        .from_component_in_hierarchy(LookupOptions::new().include_inactive(true));
    let container = builder.build().unwrap();

    let count = |id: &'static str| container.request::<Health>().id(id).all().unwrap().count();
    assert_eq!(count("active"), 3);
    assert_eq!(count("everything"), 4);
}

#[test]
fn test_single_resolve_from_hierarchy_requires_exactly_one() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder.bind::<Health>().from_component_sibling();
    let container = builder.build().unwrap();

    let single = container.request::<Health>().node(NodeId(2)).get().unwrap();
    assert_eq!(single.0, 20);

    let err = container.request::<Health>().node(NodeId(5)).get().unwrap_err();
    assert!(err.is_missing_binding());
    assert!(
        container
            .request::<Health>()
            .node(NodeId(5))
            .try_get()
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_node_lookup_without_node_fails() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder.bind::<Health>().from_component_sibling();
    let container = builder.build().unwrap();

    assert!(matches!(
        container.resolve::<Health>(),
        Err(BindwireError::Resolution { .. })
    ));
}

#[test]
fn test_hierarchy_binding_requires_component_or_interface() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder.bind::<u32>().from_component_sibling();

    assert!(matches!(
        builder.build(),
        Err(BindwireError::BindingType { .. })
    ));
}

#[test]
fn test_exclude_self_drops_components_on_requesting_node() {
    let (scene, _) = scene();
    let mut builder = builder_with_scene(scene);
    builder
        .bind::<Health>()
        .with_id("below")
        .from_component_in_children(LookupOptions::new().exclude_self(true));
    builder
        .bind::<Health>()
        .with_id("elsewhere")
        .from_component_in_hierarchy(LookupOptions::new().exclude_self(true));
    let container = builder.build().unwrap();

    let lookup = |id: &'static str, node: NodeId| -> Vec<u32> {
        container
            .request::<Health>()
            .id(id)
            .node(node)
            .all()
            .unwrap()
            .map(|h| h.0)
            .collect()
    };
    assert_eq!(lookup("below", NodeId(1)), vec![20, 30]);
    assert_eq!(lookup("below", NodeId(2)), Vec::<u32>::new());
    assert_eq!(lookup("elsewhere", NodeId(2)), vec![100, 30]);
    assert_eq!(lookup("elsewhere", NodeId(1)), vec![20, 30]);
}
