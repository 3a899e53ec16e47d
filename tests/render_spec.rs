//! Territory rasterization across a sequence of ownership changes.

mod common;

use common::small_params;
use np_timelapse::models::{Owner, OwnershipEvent, Star};
use np_timelapse::render::{
    dirty_cells, render_full, IncrementalRepainter, OwnershipState, PixelClass, Rasterizer,
    SpatialGrid,
};
use np_timelapse::TimelapseError;
use speculate2::speculate;

/// A loose cluster with several stars sharing neighborhoods.
fn cluster() -> Vec<Star> {
    vec![
        Star::new(1, 0.0, 0.0),
        Star::new(2, 0.5, 0.1),
        Star::new(3, 0.2, 0.55),
        Star::new(4, 1.4, 1.3),
        Star::new(5, 2.9, 0.4),
        Star::new(6, 3.2, 2.8),
        Star::new(7, -1.1, 2.2),
    ]
}

fn events(tick: u32, owners: &[(u32, Owner)]) -> Vec<OwnershipEvent> {
    owners
        .iter()
        .map(|&(star, owner)| OwnershipEvent::new(tick, star, owner))
        .collect()
}

speculate! {
    before {
        let params = small_params();
        let grid = SpatialGrid::build(cluster(), params.max_dist).expect("Failed to build grid");
    }

    describe "incremental repaint" {
        it "matches a full render after every tick" {
            let history = vec![
                events(0, &[(1, Owner::Player(1)), (4, Owner::Player(2))]),
                events(1, &[(2, Owner::Player(1)), (5, Owner::Player(3))]),
                events(2, &[]),
                events(3, &[(3, Owner::Player(2)), (7, Owner::Player(1))]),
                events(4, &[(1, Owner::Player(2)), (1, Owner::Player(3))]),
                events(5, &[(2, Owner::Unclaimed), (6, Owner::Player(4))]),
            ];

            let mut repainter = IncrementalRepainter::new(&grid, params.clone()).expect("Failed to render");
            let mut expected = OwnershipState::new(grid.stars().iter().map(|s| s.id));
            assert_eq!(repainter.frame(), &render_full(&grid, &expected, &params).unwrap());

            for (tick, batch) in history.iter().enumerate() {
                let tick = tick as u32;
                repainter.apply(tick, batch).expect("Failed to apply events");
                expected.apply(tick, batch).unwrap();
                assert_eq!(
                    repainter.frame(),
                    &render_full(&grid, &expected, &params).unwrap(),
                    "frame diverged at tick {}",
                    tick
                );
            }
            assert_eq!(repainter.ownership().owner(1), Some(Owner::Player(3)));
        }

        it "leaves the frame alone for events that change nothing" {
            let mut repainter = IncrementalRepainter::new(&grid, params.clone()).expect("Failed to render");
            repainter.apply(0, &events(0, &[(1, Owner::Player(1))])).unwrap();
            let before = repainter.frame().clone();

            let summary = repainter
                .apply(1, &events(1, &[(1, Owner::Player(1)), (2, Owner::Unclaimed)]))
                .unwrap();

            assert!(summary.changed.is_empty());
            assert!(summary.dirty_cells.is_empty());
            assert_eq!(repainter.frame(), &before);
        }

        it "only marks the 3×3 neighborhoods of changed stars dirty" {
            let mut repainter = IncrementalRepainter::new(&grid, params.clone()).expect("Failed to render");
            let summary = repainter.apply(0, &events(0, &[(6, Owner::Player(1))])).unwrap();

            let star = grid.star(6).unwrap();
            let cell = grid.cell_of(star);
            assert_eq!(summary.dirty_cells, dirty_cells([6], &grid));
            assert!(summary.dirty_cells.len() <= 9);
            for dirty in &summary.dirty_cells {
                assert!((dirty.x - cell.x).abs() <= 1 && (dirty.y - cell.y).abs() <= 1);
            }
        }

        it "rejects an event for a star outside the game" {
            let mut repainter = IncrementalRepainter::new(&grid, params.clone()).expect("Failed to render");
            let before = repainter.frame().clone();

            let err = repainter.apply(0, &events(0, &[(99, Owner::Player(1))])).unwrap_err();

            assert!(matches!(err, TimelapseError::Render(_)));
            assert_eq!(repainter.frame(), &before);
        }
    }

    describe "pixel resolution" {
        it "is deterministic" {
            let mut ownership = OwnershipState::new(grid.stars().iter().map(|s| s.id));
            ownership.apply(0, &events(0, &[(1, Owner::Player(1)), (2, Owner::Player(2))])).unwrap();

            let first = render_full(&grid, &ownership, &params).unwrap();
            let second = render_full(&grid, &ownership, &params).unwrap();
            assert_eq!(first, second);
        }

        it "draws a border halfway between rival stars" {
            let pair = SpatialGrid::build(
                vec![Star::new(1, 0.0, 0.0), Star::new(2, 0.4, 0.0)],
                params.max_dist,
            )
            .unwrap();
            let mut ownership = OwnershipState::new([1, 2]);
            ownership.apply(0, &events(0, &[(1, Owner::Player(1)), (2, Owner::Player(2))])).unwrap();
            let raster = Rasterizer::new(&params);

            assert_eq!(raster.classify(0.2, 0.0, &pair, &ownership), PixelClass::Border);
            assert!(matches!(
                raster.classify(0.05, 0.0, &pair, &ownership),
                PixelClass::Owned { owner: Owner::Player(1), .. }
            ));
            assert!(matches!(
                raster.classify(0.35, 0.0, &pair, &ownership),
                PixelClass::Owned { owner: Owner::Player(2), .. }
            ));
        }

        it "leaves points beyond every star's reach as background" {
            let ownership = OwnershipState::new(grid.stars().iter().map(|s| s.id));
            let raster = Rasterizer::new(&params);
            assert_eq!(raster.classify(2.0, -0.5, &grid, &ownership), PixelClass::Background);
        }
    }
}
