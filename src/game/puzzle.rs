use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

/// Consecutive misses tolerated before a deformation sequence gives up.
const MISS_LIMIT: u32 = 10;

/// Geometric transformation applied to a single shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeTransformation {
    FlipHorizontal,
    FlipVertical,
    RotateClockwise,
    RotateAnticlockwise,
}

impl ShapeTransformation {
    pub const ALL: [ShapeTransformation; 4] = [
        ShapeTransformation::FlipHorizontal,
        ShapeTransformation::FlipVertical,
        ShapeTransformation::RotateAnticlockwise,
        ShapeTransformation::RotateClockwise,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deformation {
    pub shape_index: usize,
    pub transformation: ShapeTransformation,
}

/// One shape of a level: a grid of tile colours (0 = no tile) placed at an offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeTemplate {
    pub tile_positions: Vec<Vec<u32>>,
    pub offset_x: i32,
    pub offset_y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTemplate {
    pub shapes: Vec<ShapeTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub level_number: usize,
    pub level_template: LevelTemplate,
    pub deformations: Vec<Deformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub puzzles: Vec<Puzzle>,
}

#[derive(Debug, Error)]
pub enum LevelDataError {
    #[error("failed to read level data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed level data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("level data contains no levels")]
    Empty,
}

/// Ordered pool of level templates. Never empty.
#[derive(Debug, Clone)]
pub struct LevelRepository {
    levels: Vec<LevelTemplate>,
}

impl LevelRepository {
    pub fn new(levels: Vec<LevelTemplate>) -> Result<Self, LevelDataError> {
        if levels.is_empty() {
            return Err(LevelDataError::Empty);
        }
        Ok(Self { levels })
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LevelDataError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let levels: Vec<LevelTemplate> = serde_json::from_str(&raw)?;
        tracing::info!(count = levels.len(), "Loaded level templates");
        Self::new(levels)
    }

    /// Returns level `number`, reusing the last template once the pool runs out.
    pub fn level(&self, number: usize) -> &LevelTemplate {
        let actual = number.min(self.levels.len() - 1);
        &self.levels[actual]
    }
}

pub struct PuzzleGenerator {
    levels: LevelRepository,
    puzzles_per_round: usize,
}

impl PuzzleGenerator {
    pub fn new(levels: LevelRepository, puzzles_per_round: usize) -> Self {
        Self { levels, puzzles_per_round }
    }

    pub fn generate_round(&self, rounds_played: u32) -> Round {
        self.generate_round_with(rounds_played, &mut rand::rng())
    }

    pub fn generate_round_with<R: Rng>(&self, rounds_played: u32, rng: &mut R) -> Round {
        let first_level = rounds_played as usize * self.puzzles_per_round;
        let puzzles = (0..self.puzzles_per_round)
            .map(|i| self.generate_puzzle(first_level + i, rng))
            .collect();

        Round { puzzles }
    }

    fn generate_puzzle<R: Rng>(&self, level_number: usize, rng: &mut R) -> Puzzle {
        let level_template = self.levels.level(level_number).clone();
        let shape_count = level_template.shapes.len();

        let deformations = DeformationSequence::new(shape_count, rng)
            .take(number_of_moves(level_number, shape_count))
            .collect();

        Puzzle {
            level_number,
            level_template,
            deformations,
        }
    }
}

/// Moves grow with progression depth but are capped at three per shape.
pub fn number_of_moves(level_number: usize, shape_count: usize) -> usize {
    shape_count + (level_number * shape_count / 15).min(2 * shape_count)
}

/// Lazily yields deformations by cycling over the shapes in a shuffled order and
/// drawing, without replacement, an untried transformation for each visited shape.
/// Exhausted shapes count as misses; the sequence ends after `MISS_LIMIT` misses in a row.
pub struct DeformationSequence<'r, R: Rng> {
    order: Vec<usize>,
    available: Vec<Vec<ShapeTransformation>>,
    cursor: usize,
    misses: u32,
    rng: &'r mut R,
}

impl<'r, R: Rng> DeformationSequence<'r, R> {
    pub fn new(shape_count: usize, rng: &'r mut R) -> Self {
        let mut order: Vec<usize> = (0..shape_count).collect();
        order.shuffle(&mut *rng);

        Self {
            order,
            available: vec![ShapeTransformation::ALL.to_vec(); shape_count],
            cursor: 0,
            misses: 0,
            rng,
        }
    }
}

impl<R: Rng> Iterator for DeformationSequence<'_, R> {
    type Item = Deformation;

    fn next(&mut self) -> Option<Deformation> {
        if self.order.is_empty() {
            return None;
        }

        while self.misses < MISS_LIMIT {
            let shape_index = self.order[self.cursor];
            self.cursor = (self.cursor + 1) % self.order.len();

            let pool = &mut self.available[shape_index];
            if pool.is_empty() {
                self.misses += 1;
                continue;
            }

            self.misses = 0;
            let pick = self.rng.random_range(0..pool.len());
            let transformation = pool.swap_remove(pick);
            return Some(Deformation {
                shape_index,
                transformation,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn level_with_shapes(count: usize) -> LevelTemplate {
        LevelTemplate {
            shapes: (0..count)
                .map(|i| ShapeTemplate {
                    tile_positions: vec![vec![1, 1], vec![0, 1]],
                    offset_x: i as i32,
                    offset_y: 0,
                })
                .collect(),
        }
    }

    fn repository(levels: usize) -> LevelRepository {
        LevelRepository::new((1..=levels).map(level_with_shapes).collect()).unwrap()
    }

    #[test]
    fn test_empty_repository_is_rejected() {
        assert!(matches!(LevelRepository::new(vec![]), Err(LevelDataError::Empty)));
    }

    #[test]
    fn test_level_lookup_clamps_to_last_template() {
        let repo = repository(3);
        assert_eq!(repo.level(0).shapes.len(), 1);
        assert_eq!(repo.level(2).shapes.len(), 3);
        assert_eq!(repo.level(99).shapes.len(), 3);
    }

    #[test]
    fn test_first_round_uses_first_levels_in_order() {
        let generator = PuzzleGenerator::new(repository(8), 5);
        let mut rng = StdRng::seed_from_u64(7);

        let round = generator.generate_round_with(0, &mut rng);

        let numbers: Vec<usize> = round.puzzles.iter().map(|p| p.level_number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
        for (i, puzzle) in round.puzzles.iter().enumerate() {
            assert_eq!(puzzle.level_template, level_with_shapes(i + 1));
        }
    }

    #[test]
    fn test_later_rounds_reuse_last_template() {
        let generator = PuzzleGenerator::new(repository(6), 5);
        let mut rng = StdRng::seed_from_u64(7);

        let round = generator.generate_round_with(1, &mut rng);

        assert_eq!(round.puzzles[0].level_number, 5);
        assert_eq!(round.puzzles[4].level_number, 9);
        assert!(round.puzzles.iter().all(|p| p.level_template == level_with_shapes(6)));
    }

    #[test]
    fn test_round_size_follows_generator_setting() {
        let generator = PuzzleGenerator::new(repository(2), 3);
        assert_eq!(generator.generate_round(0).puzzles.len(), 3);

        let empty = PuzzleGenerator::new(repository(2), 0);
        assert!(empty.generate_round(0).puzzles.is_empty());
    }

    #[test]
    fn test_number_of_moves_scales_and_caps() {
        assert_eq!(number_of_moves(0, 4), 4);
        assert_eq!(number_of_moves(14, 4), 4 + 3);
        assert_eq!(number_of_moves(15, 4), 8);
        assert_eq!(number_of_moves(30, 4), 12);
        assert_eq!(number_of_moves(1000, 4), 12);
        assert_eq!(number_of_moves(5, 0), 0);
    }

    #[test]
    fn test_sequence_never_repeats_a_shape_transformation_pair() {
        let mut rng = StdRng::seed_from_u64(42);
        let sequence: Vec<Deformation> = DeformationSequence::new(5, &mut rng).collect();

        let unique: HashSet<Deformation> = sequence.iter().copied().collect();
        assert_eq!(unique.len(), sequence.len());
        assert_eq!(sequence.len(), 4 * 5);
    }

    #[test]
    fn test_sequence_visits_every_shape_each_pass() {
        let mut rng = StdRng::seed_from_u64(3);
        let sequence: Vec<Deformation> = DeformationSequence::new(4, &mut rng).collect();

        for pass in sequence.chunks(4) {
            let shapes: HashSet<usize> = pass.iter().map(|d| d.shape_index).collect();
            assert_eq!(shapes.len(), 4);
        }
    }

    #[test]
    fn test_sequence_is_truncated_to_requested_moves() {
        let generator = PuzzleGenerator::new(repository(20), 5);
        let mut rng = StdRng::seed_from_u64(11);

        let round = generator.generate_round_with(3, &mut rng);

        for puzzle in &round.puzzles {
            let shapes = puzzle.level_template.shapes.len();
            let expected = number_of_moves(puzzle.level_number, shapes).min(4 * shapes);
            assert_eq!(puzzle.deformations.len(), expected);
            assert!(puzzle.deformations.iter().all(|d| d.shape_index < shapes));
        }
    }

    #[test]
    fn test_sequence_for_no_shapes_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(DeformationSequence::new(0, &mut rng).count(), 0);
    }
}
