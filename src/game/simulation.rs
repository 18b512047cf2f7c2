//! Per-tick paddle game physics
//!
//! `advance` is the whole state transition for one tick of one session: it
//! reads the current intents, moves paddles and ball, and resolves wall
//! bounces, goals and paddle bounces in a fixed order. It owns no clocks and
//! no channels, which keeps every property testable without a runtime.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Intent, IntentPair};

/// Field and physics constants. Distances are in field units, speeds in
/// field units per tick.
pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const PADDLE_WIDTH: f32 = 20.0;
pub const PADDLE_SPEED: f32 = 5.0;
pub const BALL_SPEED_X: f32 = 5.0;
pub const BALL_SPEED_Y: f32 = 2.0;
pub const BALL_RADIUS: f32 = 10.0;
/// Horizontal gap between a paddle and its own edge of the field
pub const PADDLE_OFFSET_X: f32 = 10.0;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// One participant connected, holding for an opponent
    Waiting,
    /// Both slots filled, simulation running
    Playing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// Vertical center of the paddle
    pub y: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub a: u32,
    pub b: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

/// Authoritative simulation state of one session. Doubles as the snapshot
/// payload broadcast to both participants every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    pub status: MatchStatus,
    pub paddle_a: Paddle,
    pub paddle_b: Paddle,
    pub ball: Ball,
    pub score: Score,
    pub field: Field,
}

impl SimState {
    /// State of a freshly opened session: paddles centered, ball resting at
    /// the field midpoint until the first serve.
    pub fn new() -> Self {
        Self {
            status: MatchStatus::Waiting,
            paddle_a: Paddle {
                y: FIELD_HEIGHT / 2.0,
                height: PADDLE_HEIGHT,
            },
            paddle_b: Paddle {
                y: FIELD_HEIGHT / 2.0,
                height: PADDLE_HEIGHT,
            },
            ball: Ball {
                x: FIELD_WIDTH / 2.0,
                y: FIELD_HEIGHT / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            score: Score { a: 0, b: 0 },
            field: Field {
                width: FIELD_WIDTH,
                height: FIELD_HEIGHT,
            },
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

/// Horizontal direction of a serve. Serves go away from the side that
/// conceded the goal; the opening serve goes toward slot B's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeDirection {
    TowardLeft,
    TowardRight,
}

/// Recenter the ball and launch it at the fixed serve speed. The vertical
/// component gets a uniformly random sign.
pub fn serve<R: Rng>(sim: &mut SimState, rng: &mut R, direction: ServeDirection) {
    sim.ball.x = sim.field.width / 2.0;
    sim.ball.y = sim.field.height / 2.0;
    sim.ball.vx = match direction {
        ServeDirection::TowardLeft => -BALL_SPEED_X,
        ServeDirection::TowardRight => BALL_SPEED_X,
    };
    sim.ball.vy = if rng.gen_bool(0.5) {
        BALL_SPEED_Y
    } else {
        -BALL_SPEED_Y
    };
}

/// Advance the simulation by one tick. Callers only invoke this while
/// `status == Playing`.
pub fn advance<R: Rng>(sim: &mut SimState, intents: IntentPair, rng: &mut R) {
    step_paddle(&mut sim.paddle_a, intents.a, sim.field.height);
    step_paddle(&mut sim.paddle_b, intents.b, sim.field.height);

    sim.ball.x += sim.ball.vx;
    sim.ball.y += sim.ball.vy;

    // Top/bottom walls: elastic, only the vertical sign flips
    if (sim.ball.y - BALL_RADIUS < 0.0 && sim.ball.vy < 0.0)
        || (sim.ball.y + BALL_RADIUS > sim.field.height && sim.ball.vy > 0.0)
    {
        sim.ball.vy = -sim.ball.vy;
    }

    // Goals: ball center past an edge. The serve goes away from the side
    // that conceded.
    if sim.ball.x > sim.field.width {
        sim.score.a += 1;
        serve(sim, rng, ServeDirection::TowardLeft);
    } else if sim.ball.x < 0.0 {
        sim.score.b += 1;
        serve(sim, rng, ServeDirection::TowardRight);
    }

    // Paddle bounces. A goal above has already recentered the ball, so the
    // collision planes cannot also trigger on the same tick.
    let left_plane = PADDLE_OFFSET_X + PADDLE_WIDTH;
    let right_plane = sim.field.width - (PADDLE_OFFSET_X + PADDLE_WIDTH);

    if sim.ball.vx < 0.0
        && sim.ball.x - BALL_RADIUS < left_plane
        && overlaps(&sim.paddle_a, sim.ball.y)
    {
        sim.ball.vx = -sim.ball.vx;
    }
    if sim.ball.vx > 0.0
        && sim.ball.x + BALL_RADIUS > right_plane
        && overlaps(&sim.paddle_b, sim.ball.y)
    {
        sim.ball.vx = -sim.ball.vx;
    }
}

fn step_paddle(paddle: &mut Paddle, intent: Intent, field_height: f32) {
    match intent {
        Intent::Up => paddle.y -= PADDLE_SPEED,
        Intent::Down => paddle.y += PADDLE_SPEED,
        Intent::Idle => {}
    }
    let half = paddle.height / 2.0;
    paddle.y = paddle.y.clamp(half, field_height - half);
}

/// Ball center within the paddle's vertical extent
fn overlaps(paddle: &Paddle, ball_y: f32) -> bool {
    let half = paddle.height / 2.0;
    ball_y > paddle.y - half && ball_y < paddle.y + half
}
