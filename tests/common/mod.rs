//! Shared fixture: a three-chapter book in an in-memory store.
//!
//! ```text
//! ch1 "Chapter 1: Arrival"   d1 ─► l1 (Gunn, angry) ─► i1 (Location = 2, GunnClothes = 1)
//! ch2 "Chapter 2: Storm"     d2 ─► l2 (Mira, sad), l3 (Gunn)
//! ch3 "Chapter 3: Home"      d3 ─► l4 (Gunn, same text as l1)
//! ```

#![allow(dead_code)]

use serde_json::{json, Value};
use storybook_kernel::{BuildConfig, InMemoryContentStore, LanguageSource};

pub fn export() -> Value {
    json!({
        "GlobalVariables": [
            { "Namespace": "Game", "Variables": [
                { "Variable": "Location", "Type": "Integer", "Value": "0" },
                { "Variable": "GunnClothes", "Type": "Integer", "Value": "0" }
            ] }
        ],
        "Packages": [ { "Name": "Main", "Models": [
            { "Type": "Chapter", "Properties": { "Id": "ch1", "DisplayName": "CH1_TITLE" } },
            { "Type": "Chapter", "Properties": { "Id": "ch2", "DisplayName": "CH2_TITLE" } },
            { "Type": "Chapter", "Properties": { "Id": "ch3", "DisplayName": "CH3_TITLE" } },
            { "Type": "Entity", "Properties": { "Id": "e_gunn", "DisplayName": "CHR_GUNN" } },
            { "Type": "Entity", "Properties": { "Id": "e_mira", "DisplayName": "CHR_MIRA" } },
            { "Type": "Location", "Properties": { "Id": "loc_docks", "DisplayName": "LOC_DOCKS" } },
            { "Type": "Location", "Properties": { "Id": "loc_tavern", "DisplayName": "LOC_TAVERN" } },

            { "Type": "Dialogue", "Properties": { "Id": "d1", "Parent": "ch1", "Attachments": ["loc_docks"],
                "OutputPins": [ { "Connections": [ { "Target": "l1" } ] } ] } },
            { "Type": "DialogueFragment", "Properties": { "Id": "l1", "Parent": "d1", "Speaker": "e_gunn",
                "Text": "DLG_1", "StageDirections": "SD_1", "Color": { "r": 1.0, "g": 0.0, "b": 0.0 },
                "OutputPins": [ { "Connections": [ { "Target": "i1" } ] } ] } },
            { "Type": "Instruction", "Properties": { "Id": "i1", "Parent": "d1",
                "Expression": "Game.Location = 2;\nGame.GunnClothes = 1" } },

            { "Type": "Dialogue", "Properties": { "Id": "d2", "Parent": "ch2" } },
            { "Type": "DialogueFragment", "Properties": { "Id": "l2", "Parent": "d2", "Speaker": "e_mira",
                "Text": "DLG_2", "Color": { "r": 0.0, "g": 0.0, "b": 1.0 } } },
            { "Type": "DialogueFragment", "Properties": { "Id": "l3", "Parent": "d2", "Speaker": "e_gunn",
                "Text": "DLG_3" } },

            { "Type": "Dialogue", "Properties": { "Id": "d3", "Parent": "ch3" } },
            { "Type": "DialogueFragment", "Properties": { "Id": "l4", "Parent": "d3", "Speaker": "e_gunn",
                "Text": "DLG_4" } }
        ] } ]
    })
}

const ENGLISH: [[&str; 2]; 13] = [
    ["Key", "English"],
    ["CH1_TITLE", "Chapter 1: Arrival"],
    ["CH2_TITLE", "Chapter 2: Storm"],
    ["CH3_TITLE", "Chapter 3: Home"],
    ["CHR_GUNN", "Gunn"],
    ["CHR_MIRA", "Mira"],
    ["LOC_DOCKS", "Docks"],
    ["LOC_TAVERN", "Tavern"],
    ["DLG_1", "Hello there, friend."],
    ["DLG_2", "Storm is coming"],
    ["DLG_3", "We sail anyway"],
    ["DLG_4", "Hello there, friend."],
    ["SD_1", "(waves)"],
];

pub const GERMAN: [[&str; 2]; 12] = [
    ["Key", "German"],
    ["CH1_TITLE", "Kapitel 1: Ankunft"],
    ["CH2_TITLE", "Kapitel 2: Sturm"],
    ["CH3_TITLE", "Kapitel 3: Heimat"],
    ["CHR_GUNN", "Gunn"],
    ["CHR_MIRA", "Mira"],
    ["LOC_DOCKS", "Hafen"],
    ["LOC_TAVERN", "Taverne"],
    ["DLG_1", "Hallo, mein Freund."],
    ["DLG_2", "Ein Sturm zieht auf"],
    ["DLG_3", "Wir segeln trotzdem"],
    ["BOOK_DESC", "Eine tolle Geschichte"],
];

const FRENCH: [[&str; 2]; 11] = [
    ["Key", "French"],
    ["CH1_TITLE", "Chapitre 1 : Arrivée"],
    ["CH2_TITLE", "Chapitre 2 : Tempête"],
    ["CH3_TITLE", "Chapitre 3 : Maison"],
    ["CHR_GUNN", "Gunn"],
    ["CHR_MIRA", "Mira"],
    ["LOC_DOCKS", "Quais"],
    ["LOC_TAVERN", "Taverne"],
    ["DLG_1", "Salut, l'ami."],
    ["DLG_2", "Une tempête arrive"],
    ["BOOK_DESC", "Une belle histoire"],
];

pub const GUNN_ATLAS: &str = "Gunn_Base\nGunn_Angry\nGunn_Happy\nGunn_Sad\nGunn_Surprised\nGunn_Casual\nGunn_Armor\n";
pub const MIRA_ATLAS: &str = "Mira_Base\nMira_Angry\nMira_Happy\nMira_Sad\nMira_Surprised\n";

/// Store holding every input of the book.
pub fn book_store() -> InMemoryContentStore {
    let store = InMemoryContentStore::new();
    store.add_document("book/export.json", &export());

    store.add_rows("book/loc/en.tsv", ENGLISH);
    store.add_rows("book/loc/de.tsv", GERMAN);
    store.add_rows("book/loc/fr.tsv", FRENCH);
    store.add_rows(
        "book/loc/en_desc.tsv",
        [["Key", "Primary", "Store"], ["BOOK_DESC", "A story", "A great story about the sea"]],
    );

    store.add_rows(
        "book/registry.config.tsv",
        [
            ["Key", "Value"],
            ["Protagonist", "Gunn"],
            ["Genders", "Male"],
            ["ClothesNames", "Casual,Armor"],
        ],
    );
    store.add_rows(
        "book/registry.characters.tsv",
        [
            ["Name", "Clothes", "Atlas", "Base", "Gendered"],
            ["Gunn", "Game.GunnClothes", "gunn.txt", "Gunn", ""],
            ["Mira", "", "mira.txt", "Mira", ""],
        ],
    );
    store.add_rows(
        "book/registry.locations.tsv",
        [
            ["Number", "Name", "Sprite", "Idle", "Intro"],
            ["1", "Docks", "docks.png", "waves.ogg", "1"],
            ["2", "Tavern", "tavern.png", "-", "0"],
        ],
    );

    store.add_text("book/atlases/gunn.txt", GUNN_ATLAS);
    store.add_text("book/atlases/mira.txt", MIRA_ATLAS);
    store.add_text("book/assets/docks.png", "docks");
    store.add_text("book/assets/waves.ogg", "waves");
    store.add_text("book/assets/tavern.png", "tavern");
    store
}

/// English and German, everything translated.
pub fn config() -> BuildConfig {
    BuildConfig {
        export: "book/export.json".into(),
        registry: "book/registry".into(),
        atlas_root: "book/atlases".into(),
        asset_root: "book/assets".into(),
        output_dir: "out".into(),
        base_language: "en".into(),
        languages: vec![
            LanguageSource::new("en", "book/loc/en.tsv").with_description("book/loc/en_desc.tsv"),
            LanguageSource::new("de", "book/loc/de.tsv"),
        ],
        ..Default::default()
    }
}

/// Same book plus a French source lacking DLG_3.
pub fn config_with_french() -> BuildConfig {
    let mut config = config();
    config.languages.push(LanguageSource::new("fr", "book/loc/fr.tsv"));
    config
}
