//! Built-in post-processing effects.
//!
//! Order here decides the type ids. Append new effects at the end of the
//! list; inserting or reordering shifts the id of every later entry.

use super::{EffectRegistry, EffectTypeDef, ParameterSpec as P, RegistryError};

const TONE: &str = "Tone";
const COLOR: &str = "Color";
const BLUR: &str = "Blur & Sharpen";
const LENS: &str = "Lens";
const STYLIZE: &str = "Stylize";
const DISTORT: &str = "Distort";

pub(super) fn register_all(registry: &mut EffectRegistry) -> Result<(), RegistryError> {
    for def in builtin_defs() {
        registry.register(def)?;
    }
    Ok(())
}

fn builtin_defs() -> Vec<EffectTypeDef> {
    vec![
        // Tone
        EffectTypeDef::new("Exposure", TONE)
            .alias("ev")
            .alias("stops")
            .param(P::drag("EV", 0.0, -8.0, 8.0, 0.05)),
        EffectTypeDef::new("Contrast", TONE)
            .param(P::slider("Amount", 1.0, 0.0, 3.0))
            .param(P::slider("Pivot", 0.18, 0.0, 1.0)),
        EffectTypeDef::new("Brightness", TONE)
            .alias("lightness")
            .param(P::slider("Amount", 0.0, -1.0, 1.0)),
        EffectTypeDef::new("Gamma", TONE).param(P::drag("Gamma", 1.0, 0.1, 4.0, 0.01)),
        EffectTypeDef::new("Levels", TONE)
            .param(P::slider("In Black", 0.0, 0.0, 1.0))
            .param(P::slider("In White", 1.0, 0.0, 1.0))
            .param(P::drag("Midtones", 1.0, 0.1, 4.0, 0.01))
            .param(P::slider("Out Black", 0.0, 0.0, 1.0))
            .param(P::slider("Out White", 1.0, 0.0, 1.0)),
        EffectTypeDef::new("Tonemap", TONE)
            .alias("aces")
            .alias("filmic")
            .alias("hdr")
            .param(P::drag("Operator", 1.0, 0.0, 3.0, 1.0))
            .param(P::drag("Exposure", 1.0, 0.0, 16.0, 0.05))
            .param(P::drag("White Point", 4.0, 1.0, 32.0, 0.1)),
        // Color
        EffectTypeDef::new("Saturation", COLOR)
            .alias("vibrance")
            .param(P::slider("Amount", 1.0, 0.0, 2.0)),
        EffectTypeDef::new("Hue Shift", COLOR)
            .alias("hue")
            .param(P::drag("Degrees", 0.0, -180.0, 180.0, 1.0)),
        EffectTypeDef::new("Color Tint", COLOR)
            .label("Tint")
            .alias("colorize")
            .color3("Tint", [1.0, 0.9, 0.8])
            .param(P::slider("Strength", 0.5, 0.0, 1.0)),
        EffectTypeDef::new("White Balance", COLOR)
            .alias("temperature")
            .param(P::slider("Temperature", 0.0, -1.0, 1.0))
            .param(P::slider("Tint", 0.0, -1.0, 1.0)),
        EffectTypeDef::new("Invert", COLOR)
            .alias("negative")
            .param(P::slider("Amount", 1.0, 0.0, 1.0)),
        EffectTypeDef::new("Grayscale", COLOR)
            .alias("monochrome")
            .alias("black and white")
            .param(P::slider("Amount", 1.0, 0.0, 1.0)),
        EffectTypeDef::new("Sepia", COLOR)
            .alias("vintage")
            .param(P::slider("Amount", 1.0, 0.0, 1.0)),
        EffectTypeDef::new("LUT", COLOR)
            .label("Color Grade")
            .alias("lookup table")
            .alias("color grade")
            .param(P::slider("Intensity", 1.0, 0.0, 1.0)),
        // Blur & Sharpen
        EffectTypeDef::new("Gaussian Blur", BLUR)
            .label("Blur")
            .alias("blur")
            .alias("soften")
            .param(P::drag("Radius", 2.0, 0.0, 32.0, 0.1)),
        EffectTypeDef::new("Sharpen", BLUR)
            .alias("unsharp mask")
            .param(P::slider("Amount", 0.5, 0.0, 2.0))
            .param(P::drag("Radius", 1.0, 0.5, 8.0, 0.1)),
        EffectTypeDef::new("Bloom", BLUR)
            .alias("glow")
            .param(P::drag("Threshold", 1.0, 0.0, 8.0, 0.01))
            .param(P::slider("Intensity", 0.5, 0.0, 4.0))
            .param(P::drag("Radius", 4.0, 0.5, 16.0, 0.1))
            .color3("Tint", [1.0, 1.0, 1.0])
            .param(P::drag("Quality", 2.0, 0.0, 3.0, 1.0))
            .gpu_params(6),
        // Lens
        EffectTypeDef::new("Vignette", LENS)
            .param(P::slider("Strength", 0.5, 0.0, 1.0))
            .param(P::slider("Radius", 0.75, 0.0, 1.5))
            .param(P::slider("Softness", 0.45, 0.0, 1.0)),
        EffectTypeDef::new("Chromatic Aberration", LENS)
            .alias("fringe")
            .alias("rgb split")
            .param(P::drag("Amount", 0.005, 0.0, 0.1, 0.0005))
            .param(P::checkbox("Radial", true)),
        EffectTypeDef::new("Lens Distortion", LENS)
            .alias("barrel")
            .alias("pincushion")
            .alias("fisheye")
            .param(P::slider("K1", 0.0, -1.0, 1.0))
            .param(P::slider("K2", 0.0, -1.0, 1.0))
            .param(P::slider("Zoom", 1.0, 0.5, 2.0)),
        // Stylize
        EffectTypeDef::new("Film Grain", STYLIZE)
            .alias("noise")
            .param(P::slider("Intensity", 0.1, 0.0, 1.0))
            .param(P::drag("Size", 1.5, 0.5, 4.0, 0.05))
            .param(P::checkbox("Animated", true)),
        EffectTypeDef::new("Posterize", STYLIZE)
            .alias("quantize")
            .param(P::drag("Levels", 8.0, 2.0, 64.0, 1.0)),
        EffectTypeDef::new("Pixelate", STYLIZE)
            .alias("mosaic")
            .param(P::drag("Cell Size", 8.0, 1.0, 128.0, 1.0)),
        EffectTypeDef::new("Scanlines", STYLIZE)
            .alias("crt")
            .alias("retro")
            .param(P::slider("Intensity", 0.3, 0.0, 1.0))
            .param(P::drag("Count", 480.0, 16.0, 2160.0, 1.0))
            .param(P::drag("Scroll Speed", 0.0, -10.0, 10.0, 0.01)),
        EffectTypeDef::new("Outline", STYLIZE)
            .alias("edge detect")
            .alias("sobel")
            .param(P::slider("Threshold", 0.2, 0.0, 1.0))
            .param(P::drag("Thickness", 1.0, 0.5, 8.0, 0.1))
            .color4("Line Color", [0.0, 0.0, 0.0, 1.0]),
        EffectTypeDef::new("Dither", STYLIZE)
            .alias("bayer")
            .param(P::slider("Strength", 1.0, 0.0, 1.0))
            .param(P::drag("Levels", 4.0, 2.0, 32.0, 1.0)),
        // Distort
        EffectTypeDef::new("Wave", DISTORT)
            .alias("ripple")
            .alias("wobble")
            .param(P::drag("Amplitude", 0.01, 0.0, 0.2, 0.001))
            .param(P::drag("Frequency", 10.0, 0.0, 100.0, 0.1))
            .param(P::drag("Speed", 1.0, -10.0, 10.0, 0.01)),
        EffectTypeDef::new("Swirl", DISTORT)
            .alias("twirl")
            .alias("vortex")
            .param(P::drag("Angle", 1.0, -12.0, 12.0, 0.01))
            .param(P::slider("Radius", 0.5, 0.0, 1.0))
            .param(P::slider("Center X", 0.5, 0.0, 1.0))
            .param(P::slider("Center Y", 0.5, 0.0, 1.0)),
    ]
}
