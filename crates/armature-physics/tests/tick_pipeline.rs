//! End-to-end ticks through the engine: scene in, physics step, scene out.

use std::sync::Arc;

use approx::assert_relative_eq;
use armature_defs::{MultibodyDefinition, MultibodyEntityDatabase};
use armature_kinematics::{Anchor, BoxEntity, MultibodyEntity, Scene, SphereEntity};
use armature_physics::{EngineConfig, PhysicsEngine, PhysicsModel, Ray3};
use nalgebra::{Point3, Vector3};

const WHEELED: &str = r#"<entity name="cart">
    <material name="steel"><contact_coefficients mu="0.6" kd="0.4"/></material>
    <link name="base">
        <material name="steel"/>
        <collision><geometry><box size="1 1 0.2"/></geometry></collision>
    </link>
    <link name="wheel">
        <material name="steel"/>
        <collision><geometry><cylinder radius="0.3" length="0.1"/></geometry></collision>
    </link>
    <joint name="spin" type="continuous">
        <parent link="base"/>
        <child link="wheel"/>
        <origin xyz="0 0 0.5"/>
        <axis xyz="0 0 1"/>
        <limit velocity="2"/>
    </joint>
</entity>"#;

fn floating_engine() -> PhysicsEngine {
    PhysicsEngine::new(EngineConfig {
        gravity: [0.0; 3],
        ground_plane: false,
        ..EngineConfig::default()
    })
    .unwrap()
}

fn cart() -> Arc<MultibodyDefinition> {
    let mut database = MultibodyEntityDatabase::with_seed(11);
    database.parse_str("cart.xml", WHEELED).unwrap()
}

#[test]
fn static_body_survives_a_tick_unchanged() {
    let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
    let mut scene = Scene::new();
    let start = Anchor::at(1.0, 2.0, 0.0);
    let key = scene
        .add(BoxEntity::new("pillar", start, Vector3::new(1.0, 1.0, 3.0), false, 0.0))
        .unwrap();
    engine.add_entity(&scene, key).unwrap();

    assert_eq!(engine.tick(&mut scene), 50);
    assert_eq!(scene.get(key).unwrap().embodied().origin_anchor(), &start);

    let pose = engine
        .model("pillar")
        .unwrap()
        .pose(engine.world(), engine.config())
        .unwrap();
    assert_relative_eq!(pose.position, start.position, epsilon = 1e-6);
}

#[test]
fn dynamic_sphere_falls_and_resets() {
    let mut engine = PhysicsEngine::new(EngineConfig::default()).unwrap();
    let mut scene = Scene::new();
    let key = scene
        .add(SphereEntity::new("ball", Anchor::at(0.0, 0.0, 5.0), 0.5, true, 1.0))
        .unwrap();
    engine.add_entity(&scene, key).unwrap();

    for _ in 0..5 {
        engine.tick(&mut scene);
    }
    let z = scene.get(key).unwrap().embodied().origin_anchor().position.z;
    // Half a second of free fall is about 1.2 units.
    assert!(z < 4.0 && z > 3.5, "z = {z}");

    scene.reset();
    engine.reset(&scene);
    let pose = engine
        .model("ball")
        .unwrap()
        .pose(engine.world(), engine.config())
        .unwrap();
    assert_relative_eq!(pose.position, Vector3::new(0.0, 0.0, 5.0), epsilon = 1e-6);
    let aabb = engine.model("ball").unwrap().aabb().unwrap();
    assert_relative_eq!(aabb.min.z, 4.5, epsilon = 1e-6);
}

#[test]
fn first_hit_is_nearest_regardless_of_order() {
    for order in [["a", "b"], ["b", "a"]] {
        let mut engine = floating_engine();
        let mut scene = Scene::new();
        for id in order {
            let x = if id == "a" { 3.0 } else { 7.0 };
            let key = scene
                .add(SphereEntity::new(id, Anchor::at(x, 0.0, 1.0), 1.0, false, 0.0))
                .unwrap();
            engine.add_entity(&scene, key).unwrap();
        }

        let ray = Ray3::new(Point3::new(0.0, 0.0, 1.0), Point3::new(10.0, 0.0, 1.0));
        let hit = engine.intersect_ray_first(&ray).unwrap();
        assert_eq!(hit.key, "a");
        assert_relative_eq!(hit.t, 0.2, epsilon = 1e-6);

        let reversed = Ray3::new(Point3::new(10.0, 0.0, 1.0), Point3::new(0.0, 0.0, 1.0));
        assert_eq!(engine.intersect_ray_first(&reversed).unwrap().key, "b");
    }
}

#[test]
fn removing_twice_is_a_no_op() {
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    for (id, x) in [("near", 2.0), ("far", 5.0)] {
        let key = scene
            .add(SphereEntity::new(id, Anchor::at(x, 0.0, 0.0), 0.5, false, 0.0))
            .unwrap();
        engine.add_entity(&scene, key).unwrap();
    }
    assert_eq!(engine.model_count(), 2);

    assert!(engine.remove_entity("near"));
    assert!(!engine.remove_entity("near"));
    assert_eq!(engine.model_count(), 1);
    assert!(engine.model("near").is_none());
    assert_eq!(engine.model_keys().collect::<Vec<_>>(), ["far"]);

    let ray = Ray3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
    assert_eq!(engine.intersect_ray_first(&ray).unwrap().key, "far");
    assert_eq!(engine.intersect_ray_all(&ray).len(), 1);
}

#[test]
fn multibody_registers_links_joints_and_aggregator() {
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    let entity = MultibodyEntity::new("cart0", cart(), Anchor::at(0.0, 0.0, 1.0), true).unwrap();
    let key = scene.add(entity).unwrap();
    engine.add_entity(&scene, key).unwrap();

    let keys: Vec<&str> = engine.model_keys().collect();
    assert_eq!(keys, ["cart0", "cart0.base", "cart0.spin", "cart0.wheel"]);
    assert_eq!(engine.world().body_count(), 2);
    assert_eq!(engine.world().joint_count(), 1);
    assert_eq!(engine.model("cart0").unwrap().children().len(), 3);

    // Links have no exact ray test.
    let ray = Ray3::new(Point3::new(-5.0, 0.0, 1.0), Point3::new(5.0, 0.0, 1.0));
    assert!(engine.intersect_ray_first(&ray).is_none());

    assert!(engine.remove_entity("cart0"));
    assert_eq!(engine.model_count(), 0);
    assert_eq!(engine.world().body_count(), 0);
    assert_eq!(engine.world().joint_count(), 0);
}

#[test]
fn motor_spins_the_child_link() {
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    let entity = MultibodyEntity::new("cart0", cart(), Anchor::at(0.0, 0.0, 1.0), true).unwrap();
    let key = scene.add(entity).unwrap();
    engine.add_entity(&scene, key).unwrap();

    scene
        .get_mut(key)
        .and_then(|e| e.as_multibody_mut())
        .and_then(|m| m.motor_mut("spin"))
        .unwrap()
        .set_velocity_target(0.5);
    for _ in 0..5 {
        engine.tick(&mut scene);
    }

    let multibody = scene.get(key).and_then(|e| e.as_multibody()).unwrap();
    let motor = multibody.motor("spin").unwrap();
    assert_relative_eq!(motor.velocity_target(), 1.0);
    assert!(motor.current_velocity() > 0.5, "velocity = {}", motor.current_velocity());
    assert!(motor.current_position() > 0.2, "angle = {}", motor.current_position());

    // The wheel stays on its mount.
    let base = multibody.link("base").unwrap().anchor();
    let wheel = multibody.link("wheel").unwrap().anchor();
    let mount = base.position + base.orientation * Vector3::new(0.0, 0.0, 0.5);
    assert_relative_eq!(wheel.position, mount, epsilon = 1e-2);
    assert_relative_eq!(
        multibody.embodied().origin_anchor().position,
        base.position,
        epsilon = 1e-9
    );
}

#[test]
fn incomplete_material_leaves_nothing_behind() {
    let mut database = MultibodyEntityDatabase::with_seed(3);
    let definition = database
        .parse_str(
            "bare.xml",
            r#"<entity name="bare">
                <material name="m"/>
                <link name="base">
                    <material name="m"/>
                    <collision><geometry><sphere radius="0.5"/></geometry></collision>
                </link>
                <link name="tip">
                    <visual><material name="m"/><geometry><sphere radius="0.2"/></geometry></visual>
                </link>
                <joint name="weld" type="fixed">
                    <parent link="base"/><child link="tip"/>
                </joint>
            </entity>"#,
        )
        .unwrap();
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    let key = scene
        .add(MultibodyEntity::new("bare0", definition, Anchor::identity(), true).unwrap())
        .unwrap();

    assert!(engine.add_entity(&scene, key).is_err());
    assert_eq!(engine.model_count(), 0);
    assert_eq!(engine.world().body_count(), 0);
}

#[test]
fn scene_moves_reach_physics_on_the_next_tick() {
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    let post = scene
        .add(SphereEntity::new("post", Anchor::at(0.0, 0.0, 1.0), 0.5, false, 0.0))
        .unwrap();
    let ball = scene
        .add(SphereEntity::new("ball", Anchor::at(0.0, 10.0, 1.0), 0.5, true, 1.0))
        .unwrap();
    engine.add_entity(&scene, post).unwrap();
    engine.add_entity(&scene, ball).unwrap();

    scene.move_entity(post, Anchor::at(5.0, 0.0, 1.0)).unwrap();
    scene.move_entity(ball, Anchor::at(5.0, 10.0, 1.0)).unwrap();
    engine.tick(&mut scene);

    let ray = Ray3::new(Point3::new(0.0, 0.0, 1.0), Point3::new(10.0, 0.0, 1.0));
    let hit = engine.intersect_ray_first(&ray).unwrap();
    assert_eq!(hit.key, "post");
    assert_relative_eq!(hit.t, 0.45, epsilon = 1e-6);
    let old_spot = Ray3::new(Point3::new(-1.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0));
    assert!(engine.intersect_ray_first(&old_spot).is_none());

    let pose = engine
        .model("ball")
        .unwrap()
        .pose(engine.world(), engine.config())
        .unwrap();
    assert_relative_eq!(pose.position, Vector3::new(5.0, 10.0, 1.0), epsilon = 1e-5);
    let origin = scene.get(ball).unwrap().embodied().origin_anchor().position;
    assert_relative_eq!(origin, Vector3::new(5.0, 10.0, 1.0), epsilon = 1e-5);
}

#[test]
fn scene_moved_multibody_links_follow_on_tick() {
    let mut engine = floating_engine();
    let mut scene = Scene::new();
    let entity = MultibodyEntity::new("cart0", cart(), Anchor::at(0.0, 0.0, 1.0), false).unwrap();
    let key = scene.add(entity).unwrap();
    engine.add_entity(&scene, key).unwrap();

    scene.move_entity(key, Anchor::at(3.0, 0.0, 1.0)).unwrap();
    engine.tick(&mut scene);

    let base = engine
        .model("cart0.base")
        .unwrap()
        .pose(engine.world(), engine.config())
        .unwrap();
    assert_relative_eq!(base.position, Vector3::new(3.0, 0.0, 1.0), epsilon = 1e-5);
    let wheel = engine
        .model("cart0.wheel")
        .unwrap()
        .pose(engine.world(), engine.config())
        .unwrap();
    assert_relative_eq!(wheel.position, Vector3::new(3.0, 0.0, 1.5), epsilon = 1e-5);
}
