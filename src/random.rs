//! Derived distributions and selection helpers, all layered on [`Rng::random`].

use std::f64::consts::TAU;

use kurbo::Point;

use crate::foundation::math::{Vec3, to_hexadecimal};
use crate::rng::Rng;

impl Rng {
    /// Uniform draw in `[min, max)`.
    pub fn in_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.random() * (max - min)
    }

    /// Uniform draw in `[0, max)`.
    pub fn in_range_to(&mut self, max: f64) -> f64 {
        self.in_range(0.0, max)
    }

    /// Uniform integer draw in `[min, max)`.
    pub fn in_range_int(&mut self, min: i64, max: i64) -> i64 {
        self.in_range(min as f64, max as f64).floor() as i64
    }

    /// Normal sample centered at `mean` via Box-Muller.
    pub fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.random().max(f64::MIN_POSITIVE);
        let u2 = self.random();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// True with probability `probability`.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.random() < probability
    }

    /// Either `1.0` or `-1.0`, equiprobable.
    pub fn sign(&mut self) -> f64 {
        if self.chance(0.5) { 1.0 } else { -1.0 }
    }

    /// Uniformly chosen element of `items`. Empty input returns `None`.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = (self.random() * items.len() as f64).floor() as usize;
        items.get(idx.min(items.len() - 1))
    }

    /// Fisher-Yates shuffle of a copy of `items`; the input is left untouched.
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        for i in (1..out.len()).rev() {
            let j = (self.random() * (i + 1) as f64).floor() as usize;
            out.swap(i, j.min(i));
        }
        out
    }

    /// Random point on the perimeter of a circle of `radius`.
    pub fn on_circle(&mut self, radius: f64) -> Point {
        let theta = self.random() * TAU;
        Point::new(radius * theta.cos(), radius * theta.sin())
    }

    /// Random point inside a circle of `radius`, uniform over its area.
    pub fn inside_circle(&mut self, radius: f64) -> Point {
        let unit = self.on_circle(1.0);
        let r = radius * self.random().sqrt();
        Point::new(unit.x * r, unit.y * r)
    }

    /// Random point in the axis-aligned square `[min, max) x [min, max)`.
    pub fn in_square(&mut self, min: f64, max: f64) -> Point {
        let x = self.in_range(min, max);
        let y = self.in_range(min, max);
        Point::new(x, y)
    }

    /// Random point on the surface of a sphere of `radius`.
    pub fn on_sphere(&mut self, radius: f64) -> Vec3 {
        let phi = self.random() * TAU;
        let v = self.random() * 2.0 - 1.0;
        let theta = v.acos();
        Vec3::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
        )
    }

    /// Random point inside a sphere of `radius`, uniform over its volume.
    pub fn inside_sphere(&mut self, radius: f64) -> Vec3 {
        let phi = self.random() * TAU;
        let v = self.random() * 2.0 - 1.0;
        let k = self.random();
        let theta = v.acos();
        let r = radius * k.cbrt();
        Vec3::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        )
    }

    /// Poisson-distributed count with rate `lambda` (Knuth's product method).
    /// Non-positive rates return 0.
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        let limit = (-lambda).exp();
        let mut k = 0u64;
        let mut p = 1.0;
        loop {
            p *= self.random();
            if p <= limit {
                return k;
            }
            k += 1;
        }
    }

    /// Random opaque `#rrggbb` color string.
    pub fn hex_color(&mut self) -> String {
        let mut out = String::with_capacity(7);
        out.push('#');
        for _ in 0..3 {
            out.push_str(&to_hexadecimal(self.in_range_int(0, 256) as u8));
        }
        out
    }
}
