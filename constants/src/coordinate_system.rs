/// Coordinate transformation matrices (row-major: [x_new, y_new, z_new])

/// Identity
pub const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// (x, y, z) -> (-x, y, z)
pub const NEG_X: [[f64; 3]; 3] = [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// (x, y, z) -> (x, -y, z)
pub const NEG_Y: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]];

/// (x, y, z) -> (x, y, -z)
pub const NEG_Z: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];

/// (x, y, z) -> (x, z, y)
pub const SWAP_YZ: [[f64; 3]; 3] = [
    [1.0, 0.0, 0.0], // X = X
    [0.0, 0.0, 1.0], // Y = Z
    [0.0, 1.0, 0.0], // Z = Y
];

/// (x, y, z) -> (x, -z, y)
pub const SWAP_YZ_NEG_Y: [[f64; 3]; 3] = [
    [1.0, 0.0, 0.0],  // X = X
    [0.0, 0.0, -1.0], // Y = -Z
    [0.0, 1.0, 0.0],  // Z = Y
];

/// (x, y, z) -> (x, z, -y), the -90° X rotation
pub const SWAP_YZ_NEG_Z: [[f64; 3]; 3] = [
    [1.0, 0.0, 0.0],  // X = X
    [0.0, 0.0, 1.0],  // Y = Z
    [0.0, -1.0, 0.0], // Z = -Y
];

/// (x, y, z) -> (-x, -y, -z)
pub const NEG_ALL: [[f64; 3]; 3] = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];

/// Apply a transformation matrix to a single coordinate triple.
pub fn transform_coordinates(matrix: &[[f64; 3]; 3], x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let input = [x, y, z];
    let mut output = [0.0; 3];

    for i in 0..3 {
        for j in 0..3 {
            output[i] += matrix[i][j] * input[j];
        }
    }

    (output[0], output[1], output[2])
}
