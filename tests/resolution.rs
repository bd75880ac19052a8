//! End-to-end resolution properties over seeded random inventories.
//!
//! Every test drives the public API only: build an inventory, pick or force a
//! layout, and check the geometric guarantees on the resulting assignments.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zenboard::layout::Signature;
use zenboard::*;

// ---- Helpers ----

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn square_canvas() -> EngineConfig {
    EngineConfig {
        canvas: CanvasConfig::new(1000, 1000, 300),
        ..EngineConfig::default()
    }
}

fn towel_and_smalls(smalls: usize) -> Inventory {
    Inventory::new()
        .with(Item::new("towel", Role::Hero, 1000, 2000).unwrap())
        .with_many(Role::Small, smalls, 500, 500)
        .unwrap()
}

/// A few hand-authored templates of the kind kept in a template directory.
fn stored_templates() -> Vec<StaticLayout> {
    vec![
        StaticLayout::new(
            "hero_and_three",
            vec![
                Slot::new("hero", Role::Hero, FracRect::new(0.05, 0.05, 0.5, 0.9)),
                Slot::new("s1", Role::Small, FracRect::new(0.6, 0.05, 0.35, 0.28)),
                Slot::new("s2", Role::Small, FracRect::new(0.6, 0.36, 0.35, 0.28)),
                Slot::new("s3", Role::Small, FracRect::new(0.6, 0.67, 0.35, 0.28)),
            ],
        ),
        StaticLayout::new(
            "hero_with_inset",
            vec![
                Slot::new("hero", Role::Hero, FracRect::new(0.05, 0.05, 0.9, 0.9)),
                Slot::new("inset", Role::Small, FracRect::new(0.7, 0.7, 0.2, 0.2)).z_priority(1),
            ],
        ),
        StaticLayout::new(
            "pair",
            vec![
                Slot::new("left", Role::Large, FracRect::new(0.05, 0.05, 0.43, 0.9)),
                Slot::new("right", Role::Large, FracRect::new(0.52, 0.05, 0.43, 0.9)),
            ],
        ),
    ]
}

fn random_inventory(rng: &mut StdRng) -> Inventory {
    let mut inv = Inventory::new();
    let heroes = rng.gen_range(0..=2);
    for _ in 0..heroes {
        inv.push(Item::new("hero", Role::Hero, rng.gen_range(200..4000), rng.gen_range(200..4000)).unwrap());
    }
    let others = rng.gen_range(if heroes == 0 { 1 } else { 0 }..=6);
    for _ in 0..others {
        let role = Role::ALL[rng.gen_range(1..Role::ALL.len())];
        inv.push(Item::new(role.as_str(), role, rng.gen_range(50..3000), rng.gen_range(50..3000)).unwrap());
    }
    inv
}

fn assert_sound(config: &EngineConfig, resolution: &Resolution, inventory: &Inventory) {
    assert_eq!(resolution.assignments.len(), inventory.len(), "{}", resolution.layout);
    let canvas = Rect::from_size(config.canvas.size());
    for (i, a) in resolution.assignments.iter().enumerate() {
        assert_eq!(a.z, i as u32, "assignments sorted by z");
        assert!(canvas.contains(&a.slot));
        let fitted = a.fitted();
        assert!(a.slot.contains(&fitted), "{}: {fitted:?} outside {:?}", a.item.key, a.slot);
        assert!(fitted.width == a.slot.width || fitted.height == a.slot.height);
        let (sw, sh) = (a.item.size.width as f64, a.item.size.height as f64);
        let (fw, fh) = (fitted.width as f64, fitted.height as f64);
        assert!(
            (fh - fw * sh / sw).abs() <= 1.0 || (fw - fh * sw / sh).abs() <= 1.0,
            "{}: {fitted:?} strays from the {sw}×{sh} aspect",
            a.item.key
        );
        for b in &resolution.assignments[i + 1..] {
            if a.z_priority == b.z_priority {
                assert!(
                    !overlaps(&a.slot, &b.slot, config.overlap_tolerance_px),
                    "{}: '{}' overlaps '{}'",
                    resolution.layout,
                    a.slot_name,
                    b.slot_name
                );
            }
        }
    }
}

// ---- Properties ----

#[test]
fn random_inventories_resolve_without_overlap() {
    init_logging();
    let config = EngineConfig::default();
    let library = TemplateLibrary::from_layouts(stored_templates()).with_mirrors();
    let resolver = Resolver::new(&config, &library);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut resolved = 0;
    for _ in 0..300 {
        let inventory = random_inventory(&mut rng);
        for mode in [MatchMode::Strict, MatchMode::Flexible] {
            match resolver.select(&inventory, &Request::Auto, mode, &mut rng) {
                Ok(r) => {
                    assert_sound(&config, &r, &inventory);
                    resolved += 1;
                }
                Err(Error::Unresolvable(e)) => {
                    assert_eq!(e.mode, mode);
                    assert!(inventory.count(e.role) > 0 || e.tried > 0, "{e}");
                }
                Err(e) => panic!("unexpected error for {}: {e}", inventory.describe_counts()),
            }
        }
    }
    assert!(resolved > 300, "only {resolved} resolutions succeeded");
}

#[test]
fn every_active_archetype_stays_in_safe_area() {
    let config = EngineConfig::default();
    let library = TemplateLibrary::default();
    let resolver = Resolver::new(&config, &library);
    let safe = config.canvas.safe_area();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let inventory = random_inventory(&mut rng);
        for archetype in zenboard::archetype::active(&inventory) {
            let r = resolver
                .resolve(&LayoutDescription::Dynamic(archetype), &inventory, MatchMode::Strict)
                .unwrap_or_else(|e| panic!("{archetype} on {}: {e}", inventory.describe_counts()));
            assert_sound(&config, &r, &inventory);
            assert!(r.assignments.iter().all(|a| safe.contains(&a.slot)), "{archetype}");
        }
    }
}

#[test]
fn same_seed_same_resolution() {
    let config = EngineConfig::default();
    let library = TemplateLibrary::from_layouts(stored_templates()).with_mirrors();
    let resolver = Resolver::new(&config, &library);
    let inventory = towel_and_smalls(3);

    for seed in [0, 1, 42, 9001] {
        let a = resolver
            .select_seeded(&inventory, &Request::Auto, MatchMode::Flexible, seed)
            .unwrap();
        let b = resolver
            .select_seeded(&inventory, &Request::Auto, MatchMode::Flexible, seed)
            .unwrap();
        assert_eq!(a, b, "seed {seed}");
    }
}

#[test]
fn seeds_give_visual_variety() {
    let config = EngineConfig::default();
    let library = TemplateLibrary::from_layouts(stored_templates());
    let resolver = Resolver::new(&config, &library);
    let inventory = towel_and_smalls(3);

    let chosen: std::collections::BTreeSet<String> = (0..40)
        .map(|seed| {
            resolver
                .select_seeded(&inventory, &Request::Auto, MatchMode::Strict, seed)
                .unwrap()
                .layout
        })
        .collect();
    assert!(chosen.len() > 1, "always picked {chosen:?}");
}

#[test]
fn static_layout_never_drops_items() {
    let config = EngineConfig::default();
    let library = TemplateLibrary::from_layouts(stored_templates()).with_mirrors();
    let resolver = Resolver::new(&config, &library);
    // More small items than any stored template has small slots.
    let inventory = towel_and_smalls(4);

    for mode in [MatchMode::Strict, MatchMode::Flexible] {
        let candidates = resolver.candidates(&inventory, mode);
        assert!(candidates.iter().all(|c| c.source() != LayoutSource::Static));
        for layout in library.layouts() {
            let err = resolver
                .resolve(&LayoutDescription::Static(layout.clone()), &inventory, mode)
                .unwrap_err();
            assert!(matches!(err, Error::Unresolvable(_)), "{}: {err}", layout.name);
        }
        for seed in 0..10 {
            let r = resolver
                .select_seeded(&inventory, &Request::Auto, mode, seed)
                .unwrap();
            assert_eq!(r.assignments.len(), 5);
        }
    }
}

// ---- Round trip ----

#[test]
fn archetype_survives_save_and_reload() {
    let config = EngineConfig::default();
    let empty = TemplateLibrary::default();
    let resolver = Resolver::new(&config, &empty);
    let inventory = Inventory::new()
        .with(Item::new("towel", Role::Hero, 1000, 2000).unwrap())
        .with_many(Role::Large, 1, 800, 600)
        .unwrap()
        .with_many(Role::Small, 3, 500, 500)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let active = zenboard::archetype::active(&inventory);
    assert!(!active.is_empty());
    for archetype in &active {
        let generated = archetype.generate(&inventory, &config.canvas).unwrap();
        TemplateLibrary::save(dir.path(), &generated).unwrap();
    }

    let reloaded = TemplateLibrary::from_dir(dir.path());
    assert!(reloaded.load_errors().is_empty());
    for archetype in active {
        let stored = reloaded.get(&archetype.layout_name()).unwrap();
        let dynamic = resolver
            .resolve(&LayoutDescription::Dynamic(archetype), &inventory, MatchMode::Strict)
            .unwrap();
        let from_file = resolver
            .resolve(&LayoutDescription::Static(stored.clone()), &inventory, MatchMode::Strict)
            .unwrap();
        assert_eq!(dynamic.assignments, from_file.assignments, "{archetype}");
        assert_eq!(from_file.source, LayoutSource::Static);
    }
}

// ---- Scenarios ----

#[test]
fn portrait_hero_with_three_smalls_seed_42() {
    init_logging();
    let config = EngineConfig::default();
    let library = TemplateLibrary::from_layouts(stored_templates());
    let resolver = Resolver::new(&config, &library);
    let inventory = towel_and_smalls(3);

    let r = resolver
        .select_seeded(&inventory, &Request::Auto, MatchMode::Strict, 42)
        .unwrap();

    let signature: Signature = match r.source {
        LayoutSource::Static => library.get(&r.layout).unwrap().effective_signature(),
        LayoutSource::Dynamic => Archetype::from_name(&r.layout)
            .unwrap()
            .generate(&inventory, &config.canvas)
            .unwrap()
            .effective_signature(),
        LayoutSource::Proposed => unreachable!("no tree was proposed"),
    };
    assert!(signature.range(Role::Hero).contains(1));
    assert!(!signature.range(Role::Hero).contains(2));
    assert!(signature.range(Role::Small).max >= 3);

    let hero = r.get("towel").unwrap().fitted();
    let aspect = hero.width as f64 / hero.height as f64;
    assert!((aspect - 0.5).abs() < 0.01, "hero fitted to {hero:?}");
}

#[test]
fn proposed_tree_scenario() {
    let config = square_canvas();
    let library = TemplateLibrary::default();
    let tree: LayoutNode = serde_json::from_str(
        r#"{"type": "split", "axis": "horizontal", "children": [
            {"proportion": 0.6, "node": {"type": "leaf", "role": "hero"}},
            {"proportion": 0.4, "node": {"type": "split", "axis": "vertical", "children": [
                {"proportion": 0.5, "node": {"type": "leaf", "role": "small"}},
                {"proportion": 0.5, "node": {"type": "leaf", "role": "small"}}
            ]}}
        ]}"#,
    )
    .unwrap();
    let request = Request::Proposed { tree, fallback: false };

    let r = Resolver::new(&config, &library)
        .select_seeded(&towel_and_smalls(2), &request, MatchMode::Strict, 0)
        .unwrap();
    assert_eq!(r.source, LayoutSource::Proposed);
    assert_eq!(r.get("towel").unwrap().slot, Rect::new(0, 0, 600, 1000));
    let mut smalls: Vec<Rect> = r
        .assignments
        .iter()
        .filter(|a| a.item.role == Role::Small)
        .map(|a| a.slot)
        .collect();
    smalls.sort_by_key(|s| s.y);
    assert_eq!(smalls, [Rect::new(600, 0, 400, 500), Rect::new(600, 500, 400, 500)]);
}

#[test]
fn rotation_disabled_zeroes_every_hint() {
    let config = EngineConfig::default();
    assert!(!config.render.rotation_enabled);
    let tilted: Vec<StaticLayout> = stored_templates()
        .into_iter()
        .map(|mut l| {
            for (i, s) in l.slots.iter_mut().enumerate() {
                s.rotation = 5.0 + i as f32;
            }
            l
        })
        .collect();
    let library = TemplateLibrary::from_layouts(tilted);
    let resolver = Resolver::new(&config, &library);
    for name in ["hero_and_three", "hero_with_inset"] {
        let smalls = if name == "hero_and_three" { 3 } else { 1 };
        let r = resolver
            .select_seeded(&towel_and_smalls(smalls), &Request::Named(name.into()), MatchMode::Strict, 1)
            .unwrap();
        assert_eq!(r.layout, name);
        assert!(r.assignments.iter().all(|a| a.rotation != 0.0));
        assert!(r.assignments.iter().all(|a| a.effective_rotation(&config.render) == 0.0));
    }
}

#[test]
fn config_file_drives_flexible_matching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.json");
    std::fs::write(
        &path,
        r#"{
            "canvas": {"width": 2000, "height": 1000, "dpi": 150},
            "compatibility": {"large": ["support"]}
        }"#,
    )
    .unwrap();
    let config = EngineConfig::load(&path).unwrap();
    let library = TemplateLibrary::from_layouts(stored_templates());
    let resolver = Resolver::new(&config, &library);
    let inventory = Inventory::new()
        .with_many(Role::Support, 2, 800, 800)
        .unwrap();
    let pair = LayoutDescription::Static(library.get("pair").unwrap().clone());

    assert!(resolver.resolve(&pair, &inventory, MatchMode::Strict).is_err());
    let r = resolver.resolve(&pair, &inventory, MatchMode::Flexible).unwrap();
    assert_eq!(r.assignments.len(), 2);
}
