//! Floor stock loaded into an empty showroom on first start.

use tracing::info;

use crate::error::Result;
use crate::model::NewBike;
use crate::store::CatalogStore;

/// Inserts the default inventory when the store has no bikes yet.
/// Returns how many bikes were added.
pub fn seed_if_empty(store: &dyn CatalogStore) -> Result<usize> {
    if store.bike_count()? > 0 {
        return Ok(0);
    }
    let stock = default_inventory();
    let count = stock.len();
    for bike in stock {
        store.create_bike(bike)?;
    }
    info!("seeded {} bikes", count);
    Ok(count)
}

fn colors(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn default_inventory() -> Vec<NewBike> {
    vec![
        NewBike {
            mileage: Some("45 kmpl".into()),
            transmission: Some("6 Speed".into()),
            power: Some("18.4 PS".into()),
            torque: Some("14.2 Nm".into()),
            top_speed: Some("140 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Dual Channel".into()),
            weight: Some("142 kg".into()),
            tank_capacity: Some("11 L".into()),
            rating: Some("4.5".into()),
            description: Some("The Yamaha R15 V4 is a sports bike available in 5 variants and 5 colours. It is powered by a 155cc BS6 engine.".into()),
            available_colors: colors(&["Racing Blue", "Metallic Red", "Dark Knight"]),
            ..NewBike::new(
                "Yamaha R15 V4",
                "Yamaha",
                "Trending",
                182000,
                2024,
                155,
                "https://imgd.aeplcdn.com/1056x594/n/hnu58ib_1900617.png?q=80",
            )
        },
        NewBike {
            mileage: Some("35 kmpl".into()),
            transmission: Some("5 Speed".into()),
            power: Some("20.2 PS".into()),
            torque: Some("27 Nm".into()),
            top_speed: Some("114 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Single/Dual Channel".into()),
            weight: Some("195 kg".into()),
            tank_capacity: Some("13 L".into()),
            rating: Some("4.7".into()),
            description: Some("The Classic 350 is Royal Enfield's best-selling model, known for its retro styling and thumping exhaust note.".into()),
            available_colors: colors(&["Redditch Red", "Halcyon Green", "Signals Marsh Grey"]),
            ..NewBike::new(
                "Royal Enfield Classic 350",
                "Royal Enfield",
                "Popular",
                193000,
                2024,
                349,
                "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcRjMXfwbzADgo97cmtwFDuNPUJxdwolxc-Cyw&s",
            )
        },
        NewBike {
            mileage: Some("28 kmpl".into()),
            transmission: Some("6 Speed".into()),
            power: Some("46 PS".into()),
            torque: Some("39 Nm".into()),
            top_speed: Some("167 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Dual Channel with Supermoto Mode".into()),
            weight: Some("168 kg".into()),
            tank_capacity: Some("15 L".into()),
            rating: Some("4.6".into()),
            description: Some("The KTM 390 Duke is a naked streetfighter that offers thrilling performance and sharp handling.".into()),
            available_colors: colors(&["Electronic Orange", "Atlantic Blue"]),
            ..NewBike::new(
                "KTM Duke 390",
                "KTM",
                "Trending",
                311000,
                2024,
                399,
                "https://images.bikewale.com/bikewale/images/bikes/ktm/390-duke/ktm-390-duke-right-front-three-quarter.jpg",
            )
        },
        NewBike {
            mileage: Some("30 kmpl".into()),
            transmission: Some("6 Speed".into()),
            power: Some("39 PS".into()),
            torque: Some("26.1 Nm".into()),
            top_speed: Some("160 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Dual Channel".into()),
            weight: Some("179 kg".into()),
            tank_capacity: Some("17 L".into()),
            rating: Some("4.4".into()),
            description: Some("The Ninja 300 is the most affordable twin-cylinder sports bike from Kawasaki in India.".into()),
            available_colors: colors(&["Lime Green", "Candy Lime Green", "Ebony"]),
            ..NewBike::new(
                "Kawasaki Ninja 300",
                "Kawasaki",
                "Standard",
                343000,
                2024,
                296,
                "https://images.bikewale.com/bikewale/images/bikes/kawasaki/ninja-300/kawasaki-ninja-300-right-front-three-quarter.jpg",
            )
        },
        NewBike {
            mileage: Some("30 kmpl".into()),
            transmission: Some("6 Speed".into()),
            power: Some("34 PS".into()),
            torque: Some("27.3 Nm".into()),
            top_speed: Some("160 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Dual Channel".into()),
            weight: Some("174 kg".into()),
            tank_capacity: Some("11 L".into()),
            rating: Some("4.6".into()),
            description: Some("TVS Apache RR 310 is a flagship sports bike with aerodynamic design and premium features.".into()),
            available_colors: colors(&["Racing Red", "Titanium Black"]),
            ..NewBike::new(
                "TVS Apache RR 310",
                "TVS",
                "Popular",
                272000,
                2024,
                312,
                "https://images.bikewale.com/bikewale/images/bikes/tvs/apache-rr-310/tvs-apache-rr-310-right-front-three-quarter.jpg",
            )
        },
        NewBike {
            mileage: Some("20 kmpl".into()),
            transmission: Some("6 Speed".into()),
            power: Some("87 PS".into()),
            torque: Some("57.5 Nm".into()),
            top_speed: Some("220 kmph".into()),
            fuel_type: Some("Petrol".into()),
            abs: Some("Dual Channel".into()),
            weight: Some("211 kg".into()),
            tank_capacity: Some("15.4 L".into()),
            rating: Some("4.8".into()),
            description: Some("The CBR650R is a middleweight sports bike with an inline-four engine.".into()),
            available_colors: colors(&["Grand Prix Red", "Matte Gunpowder Black Metallic"]),
            ..NewBike::new(
                "Honda CBR 650R",
                "Honda",
                "Premium",
                935000,
                2024,
                649,
                "https://images.bikewale.com/bikewale/images/bikes/honda/cbr650r/honda-cbr650r-right-front-three-quarter.jpg",
            )
        },
        NewBike {
            mileage: Some("111 km/charge".into()),
            transmission: Some("Automatic".into()),
            power: Some("6.4 kW".into()),
            torque: Some("26 Nm".into()),
            top_speed: Some("90 kmph".into()),
            fuel_type: Some("Electric".into()),
            abs: Some("CBS".into()),
            weight: Some("111.6 kg".into()),
            tank_capacity: Some("N/A".into()),
            rating: Some("4.4".into()),
            description: Some("Ather 450X is a premium electric scooter known for its performance and smart features.".into()),
            available_colors: colors(&["Space Grey", "Mint Green", "White"]),
            ..NewBike::new(
                "Ather 450X",
                "Ather",
                "Electric",
                138000,
                2024,
                0,
                "https://images.bikewale.com/bikewale/images/bikes/ather/450x/ather-450x-right-front-three-quarter.jpg",
            )
        },
        NewBike {
            mileage: Some("307 km/charge".into()),
            transmission: Some("Automatic".into()),
            power: Some("30 kW".into()),
            torque: Some("100 Nm".into()),
            top_speed: Some("152 kmph".into()),
            fuel_type: Some("Electric".into()),
            abs: Some("Dual Channel".into()),
            weight: Some("207 kg".into()),
            tank_capacity: Some("N/A".into()),
            rating: Some("4.7".into()),
            description: Some("India's first high-performance electric motorcycle with futuristic design.".into()),
            available_colors: colors(&["Airstrike", "Shadow", "Laser"]),
            ..NewBike::new(
                "Ultraviolette F77",
                "Ultraviolette",
                "Electric",
                380000,
                2024,
                0,
                "https://images.bikewale.com/bikewale/images/bikes/ultraviolette/f77/ultraviolette-f77-right-front-three-quarter.jpg",
            )
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn inventory_is_valid() {
        for bike in default_inventory() {
            bike.validate().unwrap();
        }
    }

    #[test]
    fn seeds_only_once() {
        let store = MemoryStore::new();
        assert_eq!(seed_if_empty(&store).unwrap(), 8);
        assert_eq!(seed_if_empty(&store).unwrap(), 0);
        assert_eq!(store.bike_count().unwrap(), 8);
    }
}
