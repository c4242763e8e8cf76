//! Software catalog
//!
//! The set of optional software offered by the wizard. The catalog is an
//! immutable value handed to the wizard at construction time; nothing reads
//! it through global state.

use std::sync::Arc;

/// One selectable catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareEntry {
    /// Label shown in the selection list
    pub title: String,
    /// Package identifiers installed together for this entry
    pub packages: Vec<String>,
}

impl SoftwareEntry {
    pub fn new(title: impl Into<String>, packages: &[&str]) -> Self {
        Self {
            title: title.into(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Space-joined package identifiers, used as the selection identifier
    pub fn identifier(&self) -> String {
        self.packages.join(" ")
    }
}

/// Immutable list of catalog entries. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareCatalog {
    entries: Arc<[SoftwareEntry]>,
}

impl SoftwareCatalog {
    /// Build a catalog from explicit entries
    pub fn new(entries: Vec<SoftwareEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[SoftwareEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SoftwareEntry> {
        self.entries.get(index)
    }

    /// Look an entry up by its display title
    pub fn find(&self, title: &str) -> Option<&SoftwareEntry> {
        self.entries.iter().find(|e| e.title == title)
    }
}

impl Default for SoftwareCatalog {
    /// The stock desktop/developer selection shipped with the installer.
    fn default() -> Self {
        Self::new(vec![
            SoftwareEntry::new("Oh My Zsh", &["ohmyzsh"]),
            SoftwareEntry::new("Kitty", &["kitty"]),
            SoftwareEntry::new("Firefox", &["firefox"]),
            SoftwareEntry::new("VSCodium", &["vscodium-bin"]),
            SoftwareEntry::new("Git", &["git"]),
            SoftwareEntry::new("Vim", &["vim"]),
            SoftwareEntry::new("AUR Support", &["aur-support"]),
            SoftwareEntry::new("Mullvad VPN (AUR)", &["mullvad-vpn"]),
            SoftwareEntry::new("VirtualBox", &["virtualbox"]),
            SoftwareEntry::new("Gnome Tweaks", &["gnome-tweaks"]),
            SoftwareEntry::new("Eye of GNOME (eog)", &["eog"]),
            SoftwareEntry::new("LibreOffice", &["libreoffice-fresh"]),
            SoftwareEntry::new("GIMP", &["gimp"]),
            SoftwareEntry::new("Inkscape", &["inkscape"]),
            SoftwareEntry::new("GNOME Calendar", &["gnome-calendar"]),
            SoftwareEntry::new("GNOME Weather", &["gnome-weather"]),
            SoftwareEntry::new("Evolution (Email Client)", &["evolution"]),
            SoftwareEntry::new("Docker", &["docker"]),
            SoftwareEntry::new("Node.js", &["nodejs", "npm"]),
            SoftwareEntry::new("Python", &["python", "python-pip"]),
            SoftwareEntry::new("JDK (Java Development Kit)", &["jdk-openjdk"]),
            SoftwareEntry::new(
                "IntelliJ IDEA Community Edition",
                &["intellij-idea-community-edition"],
            ),
            SoftwareEntry::new("gnome-calculator", &["gnome-calculator"]),
            SoftwareEntry::new("evince (Document Viewer)", &["evince"]),
            SoftwareEntry::new("gnome-disk-utility", &["gnome-disk-utility"]),
            SoftwareEntry::new("nautilus (Files)", &["nautilus"]),
            SoftwareEntry::new("gnome-screenshot", &["gnome-screenshot"]),
            SoftwareEntry::new("gnome-control-center", &["gnome-control-center"]),
            SoftwareEntry::new("gnome-text-editor", &["gnome-text-editor"]),
            SoftwareEntry::new("aria2", &["aria2"]),
            SoftwareEntry::new("zsh-autosuggestions", &["zsh-autosuggestions"]),
            SoftwareEntry::new("zsh-syntax-highlighting", &["zsh-syntax-highlighting"]),
            SoftwareEntry::new("VLC Media Player", &["vlc"]),
            SoftwareEntry::new("MPV Media Player", &["mpv"]),
            SoftwareEntry::new("Spotify (AUR)", &["spotify"]),
            SoftwareEntry::new("Audacity", &["audacity"]),
            SoftwareEntry::new("Double Commander", &["doublecmd-gtk2"]),
            SoftwareEntry::new("Discord (AUR)", &["discord"]),
            SoftwareEntry::new("Slack (AUR)", &["slack-desktop"]),
            SoftwareEntry::new("Zoom (AUR)", &["zoom"]),
            SoftwareEntry::new("Htop", &["htop"]),
            SoftwareEntry::new("Neofetch", &["neofetch"]),
            SoftwareEntry::new("GNOME System Monitor", &["gnome-system-monitor"]),
            SoftwareEntry::new("GNOME Usage", &["gnome-usage"]),
            SoftwareEntry::new("Google Chrome (AUR)", &["google-chrome"]),
            SoftwareEntry::new("Brave Browser (AUR)", &["brave-bin"]),
            SoftwareEntry::new("OpenSSH", &["openssh"]),
            SoftwareEntry::new("NetworkManager", &["networkmanager"]),
            SoftwareEntry::new("Papirus Icon Theme", &["papirus-icon-theme"]),
            SoftwareEntry::new("Arc GTK Theme", &["arc-gtk-theme"]),
        ])
    }
}
