use delaunay_warp::*;
use glam::DVec3;

// =============================================================================

/// Drive an edit session the way a pointer would, then warp a small grid.
fn main() {
    env_logger::init();

    let mut session = EditSession::default();

    let script = [
        (DVec3::new(0.0, 0.0, 0.0), DVec3::new(0.3, 0.1, 0.0)),
        (DVec3::new(-0.6, 0.5, 0.0), DVec3::new(-0.7, 0.7, 0.0)),
        (DVec3::new(0.7, -0.6, 0.0), DVec3::new(0.6, -0.6, 0.0)),
    ];

    for (from, to) in script {
        match session.pointer_down(from, PointerButton::Primary) {
            Ok(outcome) => println!("down at {from}: {outcome:?}"),
            Err(e) => println!("down at {from}: {e}"),
        }
        match session.pointer_move(to) {
            Ok(outcome) => println!("drag to {to}: {outcome:?}"),
            Err(e) => println!("drag to {to}: {e}"),
        }
        session.pointer_up();
    }

    println!("rest points: {:?}", session.rest().points().collect::<Vec<_>>());
    println!(
        "rest triangles: {:?}",
        session
            .rest()
            .triangles()
            .map(|(_, t)| t.vertices())
            .collect::<Vec<_>>()
    );

    let mesh: Vec<DVec3> = (-2..=2)
        .flat_map(|x| (-2..=2).map(move |y| DVec3::new(x as f64 * 0.4, y as f64 * 0.4, 0.5)))
        .collect();

    match session.deform_mesh(&mesh) {
        Ok(warped) => {
            for (p, q) in mesh.iter().zip(&warped) {
                println!("{p} -> {q}");
            }
        }
        Err(e) => println!("warp failed: {e}"),
    }
}
