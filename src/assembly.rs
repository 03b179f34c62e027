// Assembly module for the robot room
//
// Each `assemble_*` function takes its renderables in the order given by the
// matching role table (`DANCER_PARTS`, `PATROL_PARTS`, ...) and hangs a fixed
// subtree under `parent`. The returned rig holds the keys of the transform
// nodes that the animation controllers drive.

use glam::{Mat4, Vec3};
use log::debug;

use crate::animation::{DanceParams, PatrolParams};
use crate::error::{Result, SceneError};
use crate::math::{self, Transform};
use crate::scene::{NodeKey, Renderable, SceneGraph};

/// Mesh a part is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Sphere,
    Plane,
    Triangle,
}

/// What the caller must supply for one slot of a rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartRole {
    pub name: &'static str,
    pub shape: Shape,
    pub color: [f32; 3],
}

const fn role(name: &'static str, shape: Shape, color: [f32; 3]) -> PartRole {
    PartRole { name, shape, color }
}

pub const DANCER_PARTS: [PartRole; 12] = [
    role("base", Shape::Sphere, [0.35, 0.35, 0.4]),
    role("body1", Shape::Sphere, [0.8, 0.3, 0.2]),
    role("body2", Shape::Sphere, [0.9, 0.6, 0.2]),
    role("body3", Shape::Sphere, [0.3, 0.6, 0.8]),
    role("arm1", Shape::Sphere, [0.6, 0.6, 0.6]),
    role("arm2", Shape::Sphere, [0.6, 0.6, 0.6]),
    role("head", Shape::Sphere, [0.9, 0.85, 0.7]),
    role("eye1", Shape::Sphere, [0.05, 0.05, 0.05]),
    role("appendage1", Shape::Sphere, [0.4, 0.8, 0.4]),
    role("appendage2", Shape::Sphere, [0.4, 0.8, 0.4]),
    role("appendage3", Shape::Sphere, [0.4, 0.8, 0.4]),
    role("eye2", Shape::Sphere, [0.05, 0.05, 0.05]),
];

pub const PATROL_PARTS: [PartRole; 5] = [
    role("body", Shape::Cube, [0.7, 0.7, 0.75]),
    role("eye1", Shape::Sphere, [0.1, 0.1, 0.6]),
    role("eye2", Shape::Sphere, [0.1, 0.1, 0.6]),
    role("antenna", Shape::Sphere, [0.3, 0.3, 0.3]),
    role("casing", Shape::Sphere, [0.95, 0.9, 0.5]),
];

pub const GLOBE_PARTS: [PartRole; 3] = [
    role("stand", Shape::Cube, [0.45, 0.3, 0.2]),
    role("axis", Shape::Sphere, [0.7, 0.7, 0.7]),
    role("earth", Shape::Sphere, [0.2, 0.45, 0.85]),
];

pub const ROOM_PARTS: [PartRole; 12] = [
    role("floor", Shape::Plane, [0.5, 0.5, 0.5]),
    role("back wall", Shape::Plane, [0.65, 0.6, 0.55]),
    role("left wall (vertical piece 1)", Shape::Plane, [0.55, 0.55, 0.6]),
    role("left wall (vertical piece 2)", Shape::Plane, [0.55, 0.55, 0.6]),
    role("left wall (horizontal piece 1)", Shape::Plane, [0.5, 0.5, 0.55]),
    role("left wall (horizontal piece 2)", Shape::Plane, [0.5, 0.5, 0.55]),
    role("window piece 1", Shape::Triangle, [0.45, 0.45, 0.5]),
    role("window piece 2", Shape::Triangle, [0.45, 0.45, 0.5]),
    role("window piece 3", Shape::Triangle, [0.45, 0.45, 0.5]),
    role("window piece 4", Shape::Triangle, [0.45, 0.45, 0.5]),
    role("right wall", Shape::Plane, [0.6, 0.55, 0.6]),
    role("ceiling", Shape::Plane, [0.4, 0.4, 0.45]),
];

/// Size and orientation of one part inside its branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartSpec {
    pub scale: Vec3,
    /// Degrees about X, Y and Z, applied in that order.
    pub rotate: Vec3,
}

impl PartSpec {
    pub fn new(scale_x: f32, scale_y: f32, scale_z: f32) -> Self {
        Self {
            scale: Vec3::new(scale_x, scale_y, scale_z),
            rotate: Vec3::ZERO,
        }
    }

    pub fn uniform(size: f32) -> Self {
        Self::new(size, size, size)
    }

    pub fn with_rotation(mut self, rotate_x: f32, rotate_y: f32, rotate_z: f32) -> Self {
        self.rotate = Vec3::new(rotate_x, rotate_y, rotate_z);
        self
    }
}

/// Builds `group -> rotX -> rotY -> rotZ -> scale -> leaf` and returns the group.
///
/// The scale node also lifts the unit mesh by half its height, so a part
/// stands on its local origin. Anything attached to the returned group is
/// positioned relative to the part's origin but does not inherit its scale.
pub fn make_branch(
    graph: &mut SceneGraph,
    name: &str,
    renderable: Box<dyn Renderable>,
    spec: PartSpec,
) -> Result<NodeKey> {
    let branch = graph.add_group(format!("{name} branch"));
    let rotate_x = graph.add_transform(format!("{name} rotateX"), math::rotate_x(spec.rotate.x));
    let rotate_y = graph.add_transform(format!("{name} rotateY"), math::rotate_y(spec.rotate.y));
    let rotate_z = graph.add_transform(format!("{name} rotateZ"), math::rotate_z(spec.rotate.z));
    let scale = graph.add_transform(
        format!("{name} scale"),
        Mat4::from_scale(spec.scale) * math::translate(0.0, 0.5, 0.0),
    );
    let model = graph.add_leaf(format!("{name} model"), renderable);

    graph.add_child(branch, rotate_x)?;
    graph.add_child(rotate_x, rotate_y)?;
    graph.add_child(rotate_y, rotate_z)?;
    graph.add_child(rotate_z, scale)?;
    graph.add_child(scale, model)?;
    Ok(branch)
}

fn take_parts<const N: usize>(
    rig: &'static str,
    parts: Vec<Box<dyn Renderable>>,
) -> Result<[Box<dyn Renderable>; N]> {
    let found = parts.len();
    parts
        .try_into()
        .map_err(|_| SceneError::PartCount { rig, expected: N, found })
}

// Dancer geometry
const DANCER_BASE_Y: f32 = 0.1;
const DANCER_BASE_XZ: f32 = 1.5;
const DANCER_BODY_Y: f32 = 1.25;
const DANCER_BODY_XZ: f32 = 0.5;
const DANCER_HEAD_SIZE: f32 = 0.5;
const DANCER_EYE_SIZE: f32 = 0.25;
const DANCER_APPENDAGE_SIZE: f32 = 0.5;

/// Keys of the dancing robot's driven joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DancerRig {
    pub root: NodeKey,
    pub lift: NodeKey,
    pub yaw: NodeKey,
    pub body: [NodeKey; 3],
    pub arms: [NodeKey; 2],
    pub head_scale: NodeKey,
}

/// Builds the dancing robot standing at `anchor`.
///
/// Joint transforms start at the rest pose given by `params`.
pub fn assemble_dancer(
    graph: &mut SceneGraph,
    parent: NodeKey,
    parts: Vec<Box<dyn Renderable>>,
    anchor: Vec3,
    params: &DanceParams,
) -> Result<DancerRig> {
    let [base, body1, body2, body3, arm1, arm2, head, eye1, appendage1, appendage2, appendage3, eye2] =
        take_parts::<12>("dancer", parts)?;

    let body_spec = PartSpec::new(DANCER_BODY_XZ, DANCER_BODY_Y, DANCER_BODY_XZ);
    let arm_spec = PartSpec::new(DANCER_BODY_XZ * 0.75, DANCER_BODY_Y, DANCER_BODY_XZ * 0.75);
    let eye_spec = PartSpec::uniform(DANCER_EYE_SIZE).with_rotation(0.0, 180.0, 0.0);
    let side_spec = PartSpec::new(
        DANCER_APPENDAGE_SIZE / 2.0,
        DANCER_APPENDAGE_SIZE,
        DANCER_APPENDAGE_SIZE / 2.0,
    );

    let base = make_branch(
        graph,
        "dancer base",
        base,
        PartSpec::new(DANCER_BASE_XZ, DANCER_BASE_Y, DANCER_BASE_XZ),
    )?;
    let body1 = make_branch(
        graph,
        "dancer body piece 1",
        body1,
        body_spec.with_rotation(params.body_angles[0], 0.0, 0.0),
    )?;
    let body2 = make_branch(
        graph,
        "dancer body piece 2",
        body2,
        body_spec.with_rotation(params.body_angles[1], 0.0, 0.0),
    )?;
    let body3 = make_branch(graph, "dancer body piece 3", body3, body_spec)?;
    let arm1 = make_branch(
        graph,
        "dancer arm 1",
        arm1,
        arm_spec.with_rotation(0.0, 0.0, params.arm_angles[0]),
    )?;
    let arm2 = make_branch(
        graph,
        "dancer arm 2",
        arm2,
        arm_spec.with_rotation(0.0, 0.0, params.arm_angles[1]),
    )?;
    let head = make_branch(graph, "dancer head", head, PartSpec::uniform(DANCER_HEAD_SIZE))?;
    let eye1 = make_branch(graph, "dancer eye 1", eye1, eye_spec)?;
    let appendage1 = make_branch(graph, "dancer appendage 1", appendage1, side_spec)?;
    let appendage2 = make_branch(graph, "dancer appendage 2", appendage2, side_spec)?;
    let appendage3 = make_branch(
        graph,
        "dancer appendage 3",
        appendage3,
        PartSpec::uniform(DANCER_APPENDAGE_SIZE),
    )?;
    let eye2 = make_branch(graph, "dancer eye 2", eye2, eye_spec)?;

    // The body pieces lean by the first segment's rest angle, so the next
    // segment sits on the tilted top of the previous one.
    let lean = params.body_angles[0].to_radians();
    let (lean_sin, lean_cos) = lean.sin_cos();
    let head_size = DANCER_HEAD_SIZE;

    let root = graph.add_group("dancer");
    let to_position = graph.add_transform(
        "translate dancer to position in room",
        Mat4::from_translation(anchor),
    );
    let to_top_base = graph.add_transform("translate to top of dancer base", math::translate(0.0, DANCER_BASE_Y, 0.0));
    let to_top_body1 = graph.add_transform(
        "translate to top of dancer body piece 1",
        math::translate(0.0, lean_cos * DANCER_BODY_Y, lean_sin * DANCER_BODY_Y),
    );
    let to_top_body2 = graph.add_transform(
        "translate to top of dancer body piece 2",
        math::translate(0.0, lean_cos * DANCER_BODY_Y, -lean_sin * DANCER_BODY_Y),
    );
    let to_middle_body1 = graph.add_transform(
        "translate to middle of dancer body (1)",
        math::translate(-DANCER_BODY_XZ / 2.0, DANCER_BODY_Y / 2.0, 0.0),
    );
    let to_middle_body2 = graph.add_transform(
        "translate to middle of dancer body (2)",
        math::translate(DANCER_BODY_XZ / 2.0, DANCER_BODY_Y / 2.0, 0.0),
    );
    let to_top_body3 = graph.add_transform("translate to top of dancer body piece 3", math::translate(0.0, DANCER_BODY_Y, 0.0));
    let to_front_head = graph.add_transform(
        "translate to front of dancer head",
        math::translate(0.0, head_size / 4.0, head_size / 3.0),
    );
    let to_head_side1 = graph.add_transform(
        "translate to side of dancer head (1)",
        math::translate(head_size / 2.0, head_size / 2.0, 0.0),
    );
    let to_head_side2 = graph.add_transform(
        "translate to side of dancer head (2)",
        math::translate(-head_size / 2.0, head_size / 2.0, 0.0),
    );
    let to_head_top = graph.add_transform("translate to top of dancer head", math::translate(0.0, head_size, 0.0));
    let to_front_appendage = graph.add_transform(
        "translate to front of dancer appendage 3",
        math::translate(0.0, head_size / 4.0, head_size / 3.0),
    );

    let rest = params.rest_pose();
    let lift = graph.add_transform("translate dancer up and down", rest.lift_matrix());
    let yaw = graph.add_transform("rotate dancer base around y axis", rest.yaw_matrix());
    let [body1_matrix, body2_matrix, body3_matrix] = rest.body_matrices();
    let rotate_body1 = graph.add_transform("rotate dancer body piece 1 around x axis", body1_matrix);
    let rotate_body2 = graph.add_transform("rotate dancer body piece 2 around z axis", body2_matrix);
    let rotate_body3 = graph.add_transform("rotate dancer body piece 3 around y axis", body3_matrix);
    let [arm1_matrix, arm2_matrix] = rest.arm_matrices();
    let rotate_arm1 = graph.add_transform("rotate dancer arm 1 around x axis", arm1_matrix);
    let rotate_arm2 = graph.add_transform("rotate dancer arm 2 around x axis", arm2_matrix);
    let head_scale = graph.add_transform("scale dancer head", rest.head_matrix());

    // base to body
    graph.add_child(parent, root)?;
    graph.add_child(root, to_position)?;
    graph.add_child(to_position, lift)?;
    graph.add_child(lift, yaw)?;
    graph.add_child(yaw, base)?;
    graph.add_child(base, to_top_base)?;
    graph.add_child(to_top_base, rotate_body1)?;
    graph.add_child(rotate_body1, body1)?;
    graph.add_child(body1, to_top_body1)?;
    graph.add_child(to_top_body1, rotate_body2)?;
    graph.add_child(rotate_body2, body2)?;
    graph.add_child(body2, to_top_body2)?;
    graph.add_child(to_top_body2, rotate_body3)?;
    graph.add_child(rotate_body3, body3)?;

    // body to arms and head
    graph.add_child(body3, to_middle_body1)?;
    graph.add_child(to_middle_body1, rotate_arm1)?;
    graph.add_child(rotate_arm1, arm1)?;
    graph.add_child(body3, to_middle_body2)?;
    graph.add_child(to_middle_body2, rotate_arm2)?;
    graph.add_child(rotate_arm2, arm2)?;
    graph.add_child(body3, to_top_body3)?;
    graph.add_child(to_top_body3, head_scale)?;
    graph.add_child(head_scale, head)?;
    graph.add_child(head, to_front_head)?;
    graph.add_child(to_front_head, eye1)?;
    graph.add_child(head, to_head_side1)?;
    graph.add_child(to_head_side1, appendage1)?;
    graph.add_child(head, to_head_side2)?;
    graph.add_child(to_head_side2, appendage2)?;
    graph.add_child(head, to_head_top)?;
    graph.add_child(to_head_top, appendage3)?;
    graph.add_child(appendage3, to_front_appendage)?;
    graph.add_child(to_front_appendage, eye2)?;

    debug!("assembled dancer at {anchor}");
    Ok(DancerRig {
        root,
        lift,
        yaw,
        body: [rotate_body1, rotate_body2, rotate_body3],
        arms: [rotate_arm1, rotate_arm2],
        head_scale,
    })
}

pub const PATROL_BODY_SIZE: f32 = 1.0;
pub const PATROL_ANTENNA_SIZE: f32 = 2.5;
pub const PATROL_CASING_SIZE: f32 = 0.75;
const PATROL_EYE_SIZE: f32 = 0.25;

/// Keys of the patrolling robot's driven transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatrolRig {
    pub root: NodeKey,
    pub position: NodeKey,
    pub heading: NodeKey,
    pub turret: NodeKey,
}

/// Builds the patrolling robot at the start of its track.
///
/// The turret hangs directly off the position node, not off the heading
/// node, so it keeps spinning independently of the body's turns.
pub fn assemble_patrol(
    graph: &mut SceneGraph,
    parent: NodeKey,
    parts: Vec<Box<dyn Renderable>>,
    params: &PatrolParams,
) -> Result<PatrolRig> {
    let [body, eye1, eye2, antenna, casing] = take_parts::<5>("patrol", parts)?;
    let eye_spec = PartSpec::uniform(PATROL_EYE_SIZE).with_rotation(0.0, 180.0, 0.0);
    let body_size = PATROL_BODY_SIZE;

    let body = make_branch(graph, "patrol body", body, PartSpec::uniform(body_size))?;
    let eye1 = make_branch(graph, "patrol eye 1", eye1, eye_spec)?;
    let eye2 = make_branch(graph, "patrol eye 2", eye2, eye_spec)?;
    let antenna = make_branch(
        graph,
        "patrol antenna",
        antenna,
        PartSpec::new(PATROL_ANTENNA_SIZE / 8.0, PATROL_ANTENNA_SIZE, PATROL_ANTENNA_SIZE / 8.0),
    )?;
    let casing = make_branch(graph, "patrol casing", casing, PartSpec::uniform(PATROL_CASING_SIZE))?;

    let root = graph.add_group("patrol");
    let to_eye1 = graph.add_transform(
        "translate to front of patrol body (eye position 1)",
        math::translate(-body_size / 4.0, body_size / 2.0, body_size / 2.0),
    );
    let to_eye2 = graph.add_transform(
        "translate to front of patrol body (eye position 2)",
        math::translate(body_size / 4.0, body_size / 2.0, body_size / 2.0),
    );
    let to_top_body = graph.add_transform("translate to top of patrol body", math::translate(0.0, body_size, 0.0));
    let to_top_antenna = graph.add_transform(
        "translate to top of patrol antenna",
        math::translate(0.0, PATROL_ANTENNA_SIZE + body_size, 0.0),
    );
    let position = graph.add_transform(
        "translate patrol to position in room",
        Mat4::from_translation(params.start_position()),
    );
    let heading = graph.add_transform("rotate patrol around y axis", math::rotate_y(params.start_heading));
    let turret = graph.add_transform(
        "rotate patrol spotlight casing around y axis",
        math::rotate_y(params.start_heading),
    );

    graph.add_child(parent, root)?;
    graph.add_child(root, position)?;
    graph.add_child(position, heading)?;
    graph.add_child(heading, body)?;
    graph.add_child(body, to_eye1)?;
    graph.add_child(to_eye1, eye1)?;
    graph.add_child(body, to_eye2)?;
    graph.add_child(to_eye2, eye2)?;
    graph.add_child(body, to_top_body)?;
    graph.add_child(to_top_body, antenna)?;
    graph.add_child(position, turret)?;
    graph.add_child(turret, to_top_antenna)?;
    graph.add_child(to_top_antenna, casing)?;

    debug!("assembled patrol robot at {}", params.start_position());
    Ok(PatrolRig {
        root,
        position,
        heading,
        turret,
    })
}

const GLOBE_POSITION: Vec3 = Vec3::new(3.5, 0.0, 3.5);
const GLOBE_STAND_HEIGHT: f32 = 1.0;
const GLOBE_AXIS_HEIGHT: f32 = 3.0;
const GLOBE_EARTH_HEIGHT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobeRig {
    pub root: NodeKey,
    pub spin: NodeKey,
}

/// Builds the globe on its stand; `spin` is the earth's yaw.
pub fn assemble_globe(
    graph: &mut SceneGraph,
    parent: NodeKey,
    parts: Vec<Box<dyn Renderable>>,
    start_angle: f32,
) -> Result<GlobeRig> {
    let [stand, axis, earth] = take_parts::<3>("globe", parts)?;

    let stand = make_branch(graph, "globe stand", stand, PartSpec::uniform(GLOBE_STAND_HEIGHT))?;
    let axis = make_branch(
        graph,
        "globe axis",
        axis,
        PartSpec::new(GLOBE_AXIS_HEIGHT / 30.0, GLOBE_AXIS_HEIGHT, GLOBE_AXIS_HEIGHT / 30.0),
    )?;
    let earth = make_branch(graph, "globe earth", earth, PartSpec::uniform(GLOBE_EARTH_HEIGHT))?;

    let root = graph.add_group("globe");
    let to_position = graph.add_transform("translate globe to position in room", Mat4::from_translation(GLOBE_POSITION));
    let to_top_stand = graph.add_transform(
        "translate to top of globe stand",
        math::translate(0.0, 3.0 * GLOBE_STAND_HEIGHT / 4.0, 0.0),
    );
    let to_middle_axis = graph.add_transform(
        "translate to middle of globe axis",
        math::translate(0.0, GLOBE_AXIS_HEIGHT / 2.0 - GLOBE_EARTH_HEIGHT / 2.0, 0.0),
    );
    let spin = graph.add_transform("rotate globe earth around y axis", math::rotate_y(start_angle));

    graph.add_child(parent, root)?;
    graph.add_child(root, to_position)?;
    graph.add_child(to_position, stand)?;
    graph.add_child(stand, to_top_stand)?;
    graph.add_child(to_top_stand, axis)?;
    graph.add_child(axis, to_middle_axis)?;
    graph.add_child(to_middle_axis, spin)?;
    graph.add_child(spin, earth)?;

    debug!("assembled globe at {GLOBE_POSITION}");
    Ok(GlobeRig { root, spin })
}

pub const ROOM_SIZE: f32 = 16.0;

/// Placement of one room panel: scale, rotate (X, Y, Z degrees), translate.
fn panel(scale: [f32; 2], rotate: [f32; 3], translate: [f32; 3]) -> Mat4 {
    Transform::from_degrees(
        Vec3::from(translate),
        Vec3::from(rotate),
        Vec3::new(scale[0], 1.0, scale[1]),
    )
    .matrix()
}

/// Builds the static room shell (floor, walls, window frame, ceiling).
pub fn assemble_room(
    graph: &mut SceneGraph,
    parent: NodeKey,
    parts: Vec<Box<dyn Renderable>>,
) -> Result<NodeKey> {
    let parts = take_parts::<12>("room", parts)?;
    let s = ROOM_SIZE;
    let placements = [
        panel([s, s], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        panel([s, s], [90.0, 0.0, 0.0], [0.0, s * 0.5, -s * 0.5]),
        panel([s * 0.25, s], [0.0, 90.0, -90.0], [-s * 0.5, s * 0.5, s * 0.375]),
        panel([s * 0.25, s], [0.0, 90.0, -90.0], [-s * 0.5, s * 0.5, -s * 0.375]),
        panel([s * 0.5, s * 0.25], [0.0, 90.0, -90.0], [-s * 0.5, s * 0.125, 0.0]),
        panel([s * 0.5, s * 0.25], [0.0, 90.0, -90.0], [-s * 0.5, s * 0.875, 0.0]),
        panel([s * 0.125, s * 0.125], [0.0, 90.0, -90.0], [-s * 0.5, s * 0.3125, s * 0.1875]),
        panel([s * 0.125, s * 0.125], [0.0, 180.0, -90.0], [-s * 0.5, s * 0.3125, -s * 0.1875]),
        panel([s * 0.125, s * 0.125], [0.0, 270.0, -90.0], [-s * 0.5, s * 0.6875, -s * 0.1875]),
        panel([s * 0.125, s * 0.125], [0.0, 0.0, -90.0], [-s * 0.5, s * 0.6875, s * 0.1875]),
        panel([s, s], [0.0, -90.0, 90.0], [s * 0.5, s * 0.5, 0.0]),
        panel([s, s], [180.0, 0.0, 0.0], [0.0, s, 0.0]),
    ];

    let root = graph.add_group("room");
    graph.add_child(parent, root)?;
    for ((part, placement), role) in parts.into_iter().zip(placements).zip(ROOM_PARTS.iter()) {
        let place = graph.add_transform(format!("room {} placement", role.name), placement);
        let model = graph.add_leaf(format!("room {} model", role.name), part);
        graph.add_child(root, place)?;
        graph.add_child(place, model)?;
    }

    debug!("assembled room of size {s}");
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl Renderable for Inert {
        fn render(&mut self, _world: &Mat4) {}
        fn release(&mut self) {}
    }

    fn inert(count: usize) -> Vec<Box<dyn Renderable>> {
        (0..count).map(|_| Box::new(Inert) as Box<dyn Renderable>).collect()
    }

    #[test]
    fn branch_stands_part_on_its_origin() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let branch = make_branch(
            &mut graph,
            "pillar",
            Box::new(Inert),
            PartSpec::new(1.0, 4.0, 1.0).with_rotation(0.0, 0.0, 90.0),
        )
        .unwrap();
        graph.add_child(root, branch).unwrap();
        graph.update();

        let model = graph.find("pillar model").unwrap();
        // unit mesh centred at the origin: its centre is lifted half the height,
        // then the whole pillar is tipped onto -X
        let centre = graph.world(model).unwrap().transform_point3(Vec3::ZERO);
        assert!(centre.abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), 1e-5), "{centre}");
        // the group itself carries no transform
        assert_eq!(graph.world(branch).unwrap(), Mat4::IDENTITY);
    }

    #[test]
    fn wrong_part_count_is_rejected() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let err = assemble_dancer(&mut graph, root, inert(11), Vec3::ZERO, &DanceParams::default()).unwrap_err();
        assert_eq!(
            err,
            SceneError::PartCount {
                rig: "dancer",
                expected: 12,
                found: 11
            }
        );
        let err = assemble_patrol(&mut graph, root, inert(6), &PatrolParams::default()).unwrap_err();
        assert_eq!(
            err,
            SceneError::PartCount {
                rig: "patrol",
                expected: 5,
                found: 6
            }
        );
        assert!(assemble_globe(&mut graph, root, inert(0), 45.0).is_err());
        assert!(assemble_room(&mut graph, root, inert(3)).is_err());
    }

    #[test]
    fn dancer_joints_are_transform_nodes_under_the_anchor() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let anchor = Vec3::new(-2.0, 0.0, -2.0);
        let rig = assemble_dancer(&mut graph, root, inert(12), anchor, &DanceParams::default()).unwrap();
        graph.update();

        for key in [rig.lift, rig.yaw, rig.head_scale]
            .into_iter()
            .chain(rig.body)
            .chain(rig.arms)
        {
            assert!(graph.local(key).is_ok());
        }
        let lift_origin = graph.world(rig.lift).unwrap().transform_point3(Vec3::ZERO);
        assert!(lift_origin.abs_diff_eq(anchor, 1e-6));
        assert_eq!(graph.parent(rig.root).unwrap(), Some(root));
    }

    #[test]
    fn patrol_turret_does_not_inherit_heading() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let rig = assemble_patrol(&mut graph, root, inert(5), &PatrolParams::default()).unwrap();
        assert_eq!(graph.parent(rig.turret).unwrap(), Some(rig.position));
        assert_eq!(graph.parent(rig.heading).unwrap(), Some(rig.position));
    }

    #[test]
    fn room_has_twelve_panels() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        let room = assemble_room(&mut graph, root, inert(12)).unwrap();
        assert_eq!(graph.children(room).unwrap().len(), 12);

        graph.update();
        let ceiling = graph.find("room ceiling model").unwrap();
        let centre = graph.world(ceiling).unwrap().transform_point3(Vec3::ZERO);
        assert!(centre.abs_diff_eq(Vec3::new(0.0, ROOM_SIZE, 0.0), 1e-4));
    }
}
