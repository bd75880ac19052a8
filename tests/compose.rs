//! Resolve-then-render runs through the public API.

#![cfg(feature = "render")]

use image::{Rgba, RgbaImage};
use zenboard::*;

const HERO_COLOR: Rgba<u8> = Rgba([200, 30, 30, 255]);
const SMALL_COLOR: Rgba<u8> = Rgba([30, 30, 200, 255]);
const HEADER_COLOR: Rgba<u8> = Rgba([20, 160, 20, 255]);

fn config() -> EngineConfig {
    EngineConfig {
        canvas: CanvasConfig::new(800, 600, 96).margins(Insets::new(60, 20, 20, 20)),
        ..EngineConfig::default()
    }
}

fn inventory() -> Inventory {
    Inventory::new()
        .with(Item::new("towel", Role::Hero, 100, 200).unwrap())
        .with(Item::new("mug", Role::Small, 50, 50).unwrap())
        .with(Item::new("cap", Role::Small, 60, 40).unwrap())
}

fn loader() -> MemoryLoader {
    MemoryLoader::new()
        .with("towel", RgbaImage::from_pixel(100, 200, HERO_COLOR))
        .with("mug", RgbaImage::from_pixel(50, 50, SMALL_COLOR))
        .with("cap", RgbaImage::from_pixel(60, 40, SMALL_COLOR))
        .with("header", RgbaImage::from_pixel(10, 2, HEADER_COLOR))
}

fn center(r: Rect) -> (u32, u32) {
    (r.x + r.width / 2, r.y + r.height / 2)
}

#[test]
fn resolved_layout_renders_at_canvas_size() {
    let mut config = config();
    config.canvas = config
        .canvas
        .asset(StaticAsset::new("header", Rect::new(0, 0, 800, 40)));
    let library = TemplateLibrary::default();
    let resolution = Resolver::new(&config, &library)
        .select_seeded(&inventory(), &Request::Auto, MatchMode::Strict, 11)
        .unwrap();

    let board = render(&config.canvas, &config.render, &resolution.assignments, &loader()).unwrap();
    assert_eq!(board.image.dimensions(), (800, 600));
    assert_eq!(board.dpi, 96);

    let (x, y) = center(resolution.get("towel").unwrap().fitted());
    assert_eq!(*board.image.get_pixel(x, y), HERO_COLOR);
    let (x, y) = center(resolution.get("mug").unwrap().fitted());
    assert_eq!(*board.image.get_pixel(x, y), SMALL_COLOR);
    assert_eq!(*board.image.get_pixel(400, 20), HEADER_COLOR);
}

#[test]
fn shadows_leave_items_intact() {
    let mut config = config();
    config.render.shadow = Some(ShadowConfig::default());
    let library = TemplateLibrary::default();
    let resolution = Resolver::new(&config, &library)
        .select_seeded(&inventory(), &Request::Named("hero_left_grid".into()), MatchMode::Strict, 0)
        .unwrap();
    let board = render(&config.canvas, &config.render, &resolution.assignments, &loader()).unwrap();

    let towel = resolution.get("towel").unwrap().fitted();
    let (x, y) = center(towel);
    assert_eq!(*board.image.get_pixel(x, y), HERO_COLOR);
    // Just past the bottom-right corner of the item the shadow darkens the background.
    let shade = board.image.get_pixel(towel.right() + 5, towel.bottom() + 5);
    assert!(shade[0] < 255, "{shade:?}");
}

#[test]
fn missing_item_fails_the_render() {
    let config = config();
    let library = TemplateLibrary::default();
    let resolution = Resolver::new(&config, &library)
        .select_seeded(&inventory(), &Request::Auto, MatchMode::Strict, 3)
        .unwrap();
    let partial = MemoryLoader::new().with("towel", RgbaImage::from_pixel(100, 200, HERO_COLOR));
    let err = render(&config.canvas, &config.render, &resolution.assignments, &partial).unwrap_err();
    assert!(err.to_string().contains("could not be loaded"), "{err}");
}

#[test]
fn files_in_and_out() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    std::fs::create_dir_all(&images).unwrap();
    RgbaImage::from_pixel(100, 200, HERO_COLOR).save(images.join("towel.png")).unwrap();
    RgbaImage::from_pixel(50, 50, SMALL_COLOR).save(images.join("mug.png")).unwrap();
    RgbaImage::from_pixel(60, 40, SMALL_COLOR).save(images.join("cap.png")).unwrap();

    let config = config();
    let library = TemplateLibrary::default();
    let resolution = Resolver::new(&config, &library)
        .select_seeded(&inventory(), &Request::Auto, MatchMode::Strict, 5)
        .unwrap();
    let board = render(
        &config.canvas,
        &config.render,
        &resolution.assignments,
        &DirectoryLoader::new(&images),
    )
    .unwrap();

    let out = dir.path().join("storyboard.png");
    board.save(&out).unwrap();
    let back = image::open(&out).unwrap();
    assert_eq!((back.width(), back.height()), (800, 600));

    let reader = png::Decoder::new(std::io::BufReader::new(std::fs::File::open(&out).unwrap()))
        .read_info()
        .unwrap();
    let dims = reader.info().pixel_dims.unwrap();
    // 96 DPI in pixels per metre.
    assert_eq!((dims.xppu, dims.unit), (3780, png::Unit::Meter));
}
