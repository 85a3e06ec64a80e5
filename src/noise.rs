//! Coherent 1D/2D simplex noise.
//!
//! A pure deterministic function of position: the same coordinates always
//! produce the same value, independent of the seeded RNG source. Use it for
//! smooth wandering motion; use [`crate::Rng`] for per-call randomness.

const F2: f64 = 0.366_025_403_784_438_6; // (sqrt(3) - 1) / 2
const G2: f64 = 0.211_324_865_405_187_1; // (3 - sqrt(3)) / 6

// Ken Perlin's reference permutation, indexed mod 256.
#[rustfmt::skip]
static PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225,
    140, 36, 103, 30, 69, 142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148,
    247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219, 203, 117, 35, 11, 32,
    57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122,
    60, 211, 133, 230, 220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54,
    65, 25, 63, 161, 1, 216, 80, 73, 209, 76, 132, 187, 208, 89, 18, 169,
    200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173, 186, 3, 64,
    52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213,
    119, 248, 152, 2, 44, 154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9,
    129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232, 178, 185, 112, 104,
    218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162, 241,
    81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157,
    184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93,
    222, 114, 67, 29, 24, 72, 243, 141, 128, 195, 78, 66, 215, 61, 156, 180,
];

fn perm(i: i64) -> u8 {
    PERM[(i & 255) as usize]
}

fn grad(hash: u8, x: f64, y: f64) -> f64 {
    let h = hash & 7;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    let su = if h & 1 == 0 { u } else { -u };
    let sv = if h & 2 == 0 { 2.0 * v } else { -2.0 * v };
    su + sv
}

fn corner(x: f64, y: f64, hash: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t <= 0.0 {
        return 0.0;
    }
    let t2 = t * t;
    t2 * t2 * grad(hash, x, y)
}

/// Simplex noise at `(x, y)`, continuous and band-limited, in roughly `[-1, 1]`.
pub fn noise_2d(x: f64, y: f64) -> f64 {
    // Skew input space onto the simplex grid.
    let s = (x + y) * F2;
    let i = (x + s).floor();
    let j = (y + s).floor();

    let t = (i + j) * G2;
    let x0 = x - (i - t);
    let y0 = y - (j - t);

    // Which of the two triangles of the skewed cell are we in?
    let (i1, j1) = if x0 > y0 { (1i64, 0i64) } else { (0i64, 1i64) };

    let x1 = x0 - i1 as f64 + G2;
    let y1 = y0 - j1 as f64 + G2;
    let x2 = x0 - 1.0 + 2.0 * G2;
    let y2 = y0 - 1.0 + 2.0 * G2;

    let ii = i as i64;
    let jj = j as i64;

    let n0 = corner(x0, y0, perm(ii + i64::from(perm(jj))));
    let n1 = corner(x1, y1, perm(ii + i1 + i64::from(perm(jj + j1))));
    let n2 = corner(x2, y2, perm(ii + 1 + i64::from(perm(jj + 1))));

    40.0 * (n0 + n1 + n2)
}

/// Simplex noise along a fixed 1D axis of the 2D field.
pub fn noise_1d(x: f64) -> f64 {
    noise_2d(x, 0.0)
}
