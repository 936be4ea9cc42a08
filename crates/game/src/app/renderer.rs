use std::collections::HashSet;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use skirmish_engine::render::{DamageNumberDraw, Hud, SpriteDraw};
use skirmish_engine::{parse_hex_color, AnimState, AssetKind, Facing, RenderFrame, SessionPhase};
use tracing::warn;
use winit::window::Window;

use super::assets::{LoadedImage, PngAssetProvider};

const CLEAR_COLOR: [u8; 4] = [18, 20, 30, 255];
const FLOOR_COLOR: [u8; 4] = [46, 40, 52, 255];
const PLAYER_PLACEHOLDER_COLOR: [u8; 4] = [96, 165, 250, 255];
const MINION_PLACEHOLDER_COLOR: [u8; 4] = [248, 113, 113, 255];
const BOSS_PLACEHOLDER_COLOR: [u8; 4] = [168, 85, 247, 255];
const HIT_FLASH_COLOR: [u8; 4] = [255, 255, 255, 255];
const OUTLINE_COLOR: [u8; 4] = [10, 10, 14, 255];
const FALLBACK_PROJECTILE_COLOR: [u8; 4] = [250, 250, 250, 255];
const HEALTH_COLOR: [u8; 4] = [220, 38, 38, 255];
const MANA_COLOR: [u8; 4] = [37, 99, 235, 255];
const BOSS_HEALTH_COLOR: [u8; 4] = [147, 51, 234, 255];
const BAR_BACK_COLOR: [u8; 4] = [40, 40, 48, 255];
const TEXT_COLOR: [u8; 4] = [240, 240, 240, 255];
const CRIT_TEXT_COLOR: [u8; 4] = [250, 204, 21, 255];
const COOLDOWN_COLOR: [u8; 4] = [0, 0, 0, 255];
const GAME_OVER_TINT: [u8; 4] = [60, 0, 0, 255];
const CLEARED_TINT: [u8; 4] = [250, 204, 21, 255];

const HUD_MARGIN_PX: i32 = 10;
const HUD_BAR_WIDTH_PX: i32 = 160;
const HUD_BAR_HEIGHT_PX: i32 = 10;
const ENEMY_BAR_HEIGHT_PX: i32 = 4;
const SLOT_BOX_PX: i32 = 28;
const DIGIT_SCALE_HUD: i32 = 3;
const DIGIT_SCALE_DAMAGE: i32 = 2;

/// 3x5 digit glyphs, one row per byte, leftmost column in bit 2.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl ScreenRectPx {
    fn from_world(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x.round() as i32,
            top: y.round() as i32,
            width: width.round().max(1.0) as i32,
            height: height.round().max(1.0) as i32,
        }
    }
}

/// Pixel target for one frame. Row-major RGBA, `width * height * 4` bytes.
struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

/// Draws the engine's frame into a fixed world-sized buffer; `pixels`
/// scales it to the window surface.
pub(crate) struct Renderer {
    pixels: Pixels<'static>,
    buffer_width: u32,
    buffer_height: u32,
    warned_missing_art: HashSet<AssetKind>,
}

impl Renderer {
    pub(crate) fn new(
        window: Arc<Window>,
        buffer_width: u32,
        buffer_height: u32,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(buffer_width, buffer_height, surface)?;
        Ok(Self {
            pixels,
            buffer_width,
            buffer_height,
            warned_missing_art: HashSet::new(),
        })
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    pub(crate) fn render_frame(
        &mut self,
        frame: &RenderFrame,
        provider: &PngAssetProvider,
    ) -> Result<(), Error> {
        let mut canvas = Canvas {
            frame: self.pixels.frame_mut(),
            width: self.buffer_width,
            height: self.buffer_height,
        };
        draw_frame(&mut canvas, frame, provider, &mut self.warned_missing_art);
        self.pixels.render()
    }
}

fn draw_frame(
    canvas: &mut Canvas<'_>,
    frame: &RenderFrame,
    provider: &PngAssetProvider,
    warned_missing_art: &mut HashSet<AssetKind>,
) {
    for chunk in canvas.frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }

    let world_rect = ScreenRectPx::from_world(0.0, 0.0, frame.world_size.x, frame.world_size.y);
    match frame.background.and_then(|handle| provider.image(handle)) {
        Some(image) => draw_image_stretched(canvas, world_rect, image, false),
        None => {
            if frame.background.is_some() {
                warn_missing_art_once(warned_missing_art, AssetKind::Background);
            }
            let floor_top = frame.floor_y.round() as i32;
            fill_rect(
                canvas,
                ScreenRectPx {
                    left: 0,
                    top: floor_top,
                    width: world_rect.width,
                    height: (world_rect.height - floor_top).max(0),
                },
                FLOOR_COLOR,
            );
        }
    }

    for sprite in &frame.sprites {
        draw_sprite(canvas, sprite, provider, warned_missing_art);
    }

    for projectile in &frame.projectiles {
        let color = parse_hex_color(projectile.color).unwrap_or(FALLBACK_PROJECTILE_COLOR);
        let rect = ScreenRectPx::from_world(
            projectile.position.x,
            projectile.position.y,
            projectile.size.x,
            projectile.size.y,
        );
        fill_rect(canvas, rect, color);
    }

    for particle in &frame.particles {
        let color = parse_hex_color(particle.color).unwrap_or(FALLBACK_PROJECTILE_COLOR);
        let half = particle.size / 2.0;
        let rect = ScreenRectPx::from_world(
            particle.position.x - half,
            particle.position.y - half,
            particle.size,
            particle.size,
        );
        blend_rect(canvas, rect, color, particle.alpha);
    }

    for number in &frame.damage_numbers {
        draw_damage_number(canvas, number);
    }

    draw_hud(canvas, &frame.hud);
}

fn draw_sprite(
    canvas: &mut Canvas<'_>,
    sprite: &SpriteDraw,
    provider: &PngAssetProvider,
    warned_missing_art: &mut HashSet<AssetKind>,
) {
    let rect = ScreenRectPx::from_world(
        sprite.position.x,
        sprite.position.y,
        sprite.size.x,
        sprite.size.y,
    );
    let flip = sprite.facing == Facing::Left;
    match sprite.image.and_then(|handle| provider.image(handle)) {
        Some(image) => {
            draw_image_stretched(canvas, rect, image, flip);
            if sprite.anim == AnimState::Hit {
                blend_rect(canvas, rect, HIT_FLASH_COLOR, 0.4);
            }
        }
        None => {
            if sprite.image.is_some() {
                warn_missing_art_once(warned_missing_art, sprite.kind);
            }
            let color = if sprite.anim == AnimState::Hit {
                HIT_FLASH_COLOR
            } else {
                placeholder_color(sprite.kind)
            };
            fill_rect(canvas, rect, color);
            draw_rect_outline(canvas, rect, OUTLINE_COLOR);
        }
    }

    if sprite.kind != AssetKind::Player && sprite.anim != AnimState::Dead {
        let bar = ScreenRectPx {
            left: rect.left,
            top: rect.top - ENEMY_BAR_HEIGHT_PX - 2,
            width: rect.width,
            height: ENEMY_BAR_HEIGHT_PX,
        };
        draw_bar(canvas, bar, sprite.health_ratio, HEALTH_COLOR);
    }
}

fn placeholder_color(kind: AssetKind) -> [u8; 4] {
    match kind {
        AssetKind::Player => PLAYER_PLACEHOLDER_COLOR,
        AssetKind::Boss => BOSS_PLACEHOLDER_COLOR,
        AssetKind::Minion | AssetKind::Background => MINION_PLACEHOLDER_COLOR,
    }
}

fn draw_damage_number(canvas: &mut Canvas<'_>, number: &DamageNumberDraw) {
    let color = if number.critical {
        CRIT_TEXT_COLOR
    } else {
        TEXT_COLOR
    };
    let width = number_width_px(u64::from(number.value), DIGIT_SCALE_DAMAGE);
    draw_number(
        canvas,
        number.position.x.round() as i32 - width / 2,
        number.position.y.round() as i32,
        u64::from(number.value),
        DIGIT_SCALE_DAMAGE,
        color,
        number.alpha,
    );
}

fn draw_hud(canvas: &mut Canvas<'_>, hud: &Hud) {
    let health_bar = ScreenRectPx {
        left: HUD_MARGIN_PX,
        top: HUD_MARGIN_PX,
        width: HUD_BAR_WIDTH_PX,
        height: HUD_BAR_HEIGHT_PX,
    };
    draw_bar(
        canvas,
        health_bar,
        fraction(hud.health, hud.max_health),
        HEALTH_COLOR,
    );
    let mana_bar = ScreenRectPx {
        top: health_bar.top + HUD_BAR_HEIGHT_PX + 4,
        ..health_bar
    };
    draw_bar(canvas, mana_bar, fraction(hud.mana, hud.max_mana), MANA_COLOR);

    let canvas_width = canvas.width as i32;
    let score_width = number_width_px(hud.score, DIGIT_SCALE_HUD);
    draw_number(
        canvas,
        canvas_width - HUD_MARGIN_PX - score_width,
        HUD_MARGIN_PX,
        hud.score,
        DIGIT_SCALE_HUD,
        TEXT_COLOR,
        1.0,
    );
    let stage_width = number_width_px(u64::from(hud.stage), DIGIT_SCALE_HUD);
    draw_number(
        canvas,
        canvas_width - HUD_MARGIN_PX - stage_width,
        HUD_MARGIN_PX + 6 * DIGIT_SCALE_HUD,
        u64::from(hud.stage),
        DIGIT_SCALE_HUD,
        CLEARED_TINT,
        1.0,
    );

    if let Some((health, max_health)) = hud.boss_health {
        let width = canvas_width / 2;
        let bar = ScreenRectPx {
            left: (canvas_width - width) / 2,
            top: HUD_MARGIN_PX,
            width,
            height: HUD_BAR_HEIGHT_PX,
        };
        draw_bar(canvas, bar, fraction(health, max_health), BOSS_HEALTH_COLOR);
    }

    let slots_top = canvas.height as i32 - HUD_MARGIN_PX - SLOT_BOX_PX;
    for slot in &hud.quick_slots {
        let rect = ScreenRectPx {
            left: HUD_MARGIN_PX + i32::from(slot.slot) * (SLOT_BOX_PX + 6),
            top: slots_top,
            width: SLOT_BOX_PX,
            height: SLOT_BOX_PX,
        };
        fill_rect(canvas, rect, BAR_BACK_COLOR);
        draw_rect_outline(canvas, rect, TEXT_COLOR);
        let cooldown_height = (SLOT_BOX_PX as f32 * slot.cooldown_ratio).round() as i32;
        if cooldown_height > 0 {
            let cover = ScreenRectPx {
                top: rect.top + rect.height - cooldown_height,
                height: cooldown_height,
                ..rect
            };
            blend_rect(canvas, cover, COOLDOWN_COLOR, 0.6);
        }
        draw_number(
            canvas,
            rect.left + 3,
            rect.top + 3,
            u64::from(slot.slot) + 1,
            2,
            TEXT_COLOR,
            1.0,
        );
    }

    let whole = ScreenRectPx {
        left: 0,
        top: 0,
        width: canvas.width as i32,
        height: canvas.height as i32,
    };
    match hud.phase {
        SessionPhase::GameOver => blend_rect(canvas, whole, GAME_OVER_TINT, 0.5),
        SessionPhase::Running if hud.stage_cleared => {
            blend_rect(canvas, whole, CLEARED_TINT, 0.12)
        }
        _ => {}
    }
}

fn fraction(value: i32, max: i32) -> f32 {
    if max <= 0 {
        return 0.0;
    }
    (value as f32 / max as f32).clamp(0.0, 1.0)
}

fn draw_bar(canvas: &mut Canvas<'_>, rect: ScreenRectPx, ratio: f32, color: [u8; 4]) {
    fill_rect(canvas, rect, BAR_BACK_COLOR);
    let filled = (rect.width as f32 * ratio.clamp(0.0, 1.0)).round() as i32;
    if filled > 0 {
        fill_rect(
            canvas,
            ScreenRectPx {
                width: filled,
                ..rect
            },
            color,
        );
    }
}

fn number_width_px(value: u64, scale: i32) -> i32 {
    let digits = value.to_string().len() as i32;
    digits * 4 * scale - scale
}

fn draw_number(
    canvas: &mut Canvas<'_>,
    left: i32,
    top: i32,
    value: u64,
    scale: i32,
    color: [u8; 4],
    alpha: f32,
) {
    let mut cursor = left;
    for digit in value.to_string().bytes() {
        let glyph = DIGIT_GLYPHS[usize::from(digit - b'0')];
        for (row, bits) in glyph.iter().enumerate() {
            for column in 0..3 {
                if bits & (0b100 >> column) == 0 {
                    continue;
                }
                let cell = ScreenRectPx {
                    left: cursor + column * scale,
                    top: top + row as i32 * scale,
                    width: scale,
                    height: scale,
                };
                blend_rect(canvas, cell, color, alpha);
            }
        }
        cursor += 4 * scale;
    }
}

fn warn_missing_art_once(warned: &mut HashSet<AssetKind>, kind: AssetKind) {
    if !warned.insert(kind) {
        return;
    }
    warn!(kind = %kind, "renderer_image_missing_using_placeholder");
}

fn write_pixel_rgba_clipped(canvas: &mut Canvas<'_>, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= canvas.width as i32 || y >= canvas.height as i32 {
        return;
    }
    let offset = (y as usize * canvas.width as usize + x as usize) * 4;
    let Some(pixel) = canvas.frame.get_mut(offset..offset + 4) else {
        return;
    };
    pixel.copy_from_slice(&color);
}

fn blend_pixel_clipped(canvas: &mut Canvas<'_>, x: i32, y: i32, color: [u8; 4], alpha: f32) {
    if x < 0 || y < 0 || x >= canvas.width as i32 || y >= canvas.height as i32 {
        return;
    }
    let offset = (y as usize * canvas.width as usize + x as usize) * 4;
    let Some(pixel) = canvas.frame.get_mut(offset..offset + 4) else {
        return;
    };
    let alpha = alpha.clamp(0.0, 1.0);
    for channel in 0..3 {
        let base = f32::from(pixel[channel]);
        let top = f32::from(color[channel]);
        pixel[channel] = (base + (top - base) * alpha).round() as u8;
    }
    pixel[3] = 255;
}

fn fill_rect(canvas: &mut Canvas<'_>, rect: ScreenRectPx, color: [u8; 4]) {
    for y in rect.top..rect.top + rect.height {
        for x in rect.left..rect.left + rect.width {
            write_pixel_rgba_clipped(canvas, x, y, color);
        }
    }
}

fn blend_rect(canvas: &mut Canvas<'_>, rect: ScreenRectPx, color: [u8; 4], alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    for y in rect.top..rect.top + rect.height {
        for x in rect.left..rect.left + rect.width {
            blend_pixel_clipped(canvas, x, y, color, alpha);
        }
    }
}

fn draw_rect_outline(canvas: &mut Canvas<'_>, rect: ScreenRectPx, color: [u8; 4]) {
    let right = rect.left + rect.width - 1;
    let bottom = rect.top + rect.height - 1;
    for x in rect.left..=right {
        write_pixel_rgba_clipped(canvas, x, rect.top, color);
        write_pixel_rgba_clipped(canvas, x, bottom, color);
    }
    for y in rect.top..=bottom {
        write_pixel_rgba_clipped(canvas, rect.left, y, color);
        write_pixel_rgba_clipped(canvas, right, y, color);
    }
}

/// Nearest-neighbour blit of `image` into `rect`, optionally mirrored.
/// Fully transparent texels are skipped.
fn draw_image_stretched(
    canvas: &mut Canvas<'_>,
    rect: ScreenRectPx,
    image: &LoadedImage,
    flip_horizontal: bool,
) {
    if image.width == 0 || image.height == 0 || rect.width <= 0 || rect.height <= 0 {
        return;
    }
    let expected_rgba_len = image.width as usize * image.height as usize * 4;
    if image.rgba.len() < expected_rgba_len {
        return;
    }

    let draw_left = rect.left.max(0);
    let draw_top = rect.top.max(0);
    let draw_right = (rect.left + rect.width).min(canvas.width as i32);
    let draw_bottom = (rect.top + rect.height).min(canvas.height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let x_step = image.width as f32 / rect.width as f32;
    let y_step = image.height as f32 / rect.height as f32;
    let image_width = image.width as usize;

    for out_y in draw_top..draw_bottom {
        let src_y = (((out_y - rect.top) as f32) * y_step) as u32;
        let src_y = src_y.min(image.height - 1) as usize;
        for out_x in draw_left..draw_right {
            let dx = out_x - rect.left;
            let dx = if flip_horizontal {
                rect.width - 1 - dx
            } else {
                dx
            };
            let src_x = ((dx as f32) * x_step) as u32;
            let src_x = src_x.min(image.width - 1) as usize;
            let src_offset = (src_y * image_width + src_x) * 4;
            let texel = &image.rgba[src_offset..src_offset + 4];
            match texel[3] {
                0 => {}
                255 => write_pixel_rgba_clipped(
                    canvas,
                    out_x,
                    out_y,
                    [texel[0], texel[1], texel[2], 255],
                ),
                alpha => blend_pixel_clipped(
                    canvas,
                    out_x,
                    out_y,
                    [texel[0], texel[1], texel[2], 255],
                    f32::from(alpha) / 255.0,
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use skirmish_engine::{Engine, EngineConfig, ImageHandle, MetaGameState};

    use super::*;

    fn pixel_at(frame: &[u8], width: u32, x: i32, y: i32) -> [u8; 4] {
        let offset = (y as usize * width as usize + x as usize) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    fn empty_provider() -> PngAssetProvider {
        PngAssetProvider::new(std::path::PathBuf::from("missing-assets"))
    }

    #[test]
    fn fill_rect_clips_at_canvas_edges() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 4,
            height: 4,
        };
        fill_rect(
            &mut canvas,
            ScreenRectPx {
                left: -2,
                top: 2,
                width: 4,
                height: 10,
            },
            [9, 9, 9, 255],
        );
        assert_eq!(pixel_at(&frame, 4, 0, 3), [9, 9, 9, 255]);
        assert_eq!(pixel_at(&frame, 4, 1, 2), [9, 9, 9, 255]);
        assert_eq!(pixel_at(&frame, 4, 2, 2), [0, 0, 0, 0]);
        assert_eq!(pixel_at(&frame, 4, 0, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn blend_mixes_toward_color() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 1,
            height: 1,
        };
        blend_pixel_clipped(&mut canvas, 0, 0, [200, 100, 0, 255], 0.5);
        assert_eq!(frame, vec![100, 50, 0, 255]);
    }

    #[test]
    fn number_width_counts_digits() {
        assert_eq!(number_width_px(7, 2), 6);
        assert_eq!(number_width_px(120, 2), 22);
    }

    #[test]
    fn missing_art_draws_placeholder_and_warns_once() {
        let engine =
            Engine::new(EngineConfig::default(), &MetaGameState::starter(), 3).expect("engine");
        let mut render = engine.render();
        let player = render.sprites.last().expect("player").clone();
        if let Some(last) = render.sprites.last_mut() {
            last.image = Some(ImageHandle(99));
        }

        let width = render.world_size.x as u32;
        let height = render.world_size.y as u32;
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let mut warned = HashSet::new();
        let provider = empty_provider();
        let mut canvas = Canvas {
            frame: &mut frame,
            width,
            height,
        };
        draw_frame(&mut canvas, &render, &provider, &mut warned);
        draw_frame(&mut canvas, &render, &provider, &mut warned);

        let cx = (player.position.x + player.size.x / 2.0) as i32;
        let cy = (player.position.y + player.size.y / 2.0) as i32;
        assert_eq!(pixel_at(&frame, width, cx, cy), PLAYER_PLACEHOLDER_COLOR);
        assert_eq!(warned.len(), 1);
        assert!(warned.contains(&AssetKind::Player));
    }

    #[test]
    fn mirrored_blit_reverses_columns() {
        let image = LoadedImage {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let mut frame = vec![0u8; 2 * 4];
        let mut canvas = Canvas {
            frame: &mut frame,
            width: 2,
            height: 1,
        };
        let rect = ScreenRectPx {
            left: 0,
            top: 0,
            width: 2,
            height: 1,
        };
        draw_image_stretched(&mut canvas, rect, &image, true);
        assert_eq!(pixel_at(&frame, 2, 0, 0), [0, 0, 255, 255]);
        assert_eq!(pixel_at(&frame, 2, 1, 0), [255, 0, 0, 255]);
    }
}
