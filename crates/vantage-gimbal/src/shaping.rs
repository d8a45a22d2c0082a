//! Input shaping and attitude math for the joystick pipeline.

/// Zero-output zone around the stick center. Outside the zone the remaining
/// travel is rescaled so full deflection still reaches 1.
pub fn deadband(value: f32, deadband: f32) -> f32 {
    if value.abs() <= deadband {
        return 0.0;
    }
    let y = (value.abs() - deadband) / (1.0 - deadband);
    y.copysign(value)
}

/// Cubic expo curve: softens response near center without giving up the
/// endpoints. `expo` in [0, 1], 0 is linear.
pub fn expo(value: f32, expo: f32) -> f32 {
    (1.0 - expo) * value + expo * value * value * value
}

/// One step of an exponential moving average with coefficient `alpha`.
pub fn ema(prev: f32, sample: f32, alpha: f32) -> f32 {
    alpha * sample + (1.0 - alpha) * prev
}

/// ZYX (Tait-Bryan) euler angles in radians to a `[w, x, y, z]` quaternion,
/// the order the gimbal messages carry on the wire.
pub fn euler_to_quat(roll: f32, pitch: f32, yaw: f32) -> [f32; 4] {
    let cr = (roll / 2.0).cos();
    let sr = (roll / 2.0).sin();
    let cp = (pitch / 2.0).cos();
    let sp = (pitch / 2.0).sin();
    let cy = (yaw / 2.0).cos();
    let sy = (yaw / 2.0).sin();

    [
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    ]
}

/// Inverse of [`euler_to_quat`]: `[w, x, y, z]` to (roll, pitch, yaw) in
/// radians. Pitch saturates at +-pi/2 near the gimbal-lock singularity.
pub fn quat_to_euler(q: [f32; 4]) -> (f32, f32, f32) {
    let [w, x, y, z] = q;

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    (roll, pitch, yaw)
}
